//! Counting implementation of `PipelineObserver`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::domain::{JobStatus, QueueName};
use crate::ports::PipelineObserver;

/// Point-in-time snapshot of a `CountingObserver`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineCounts {
    pub received: u64,
    pub redelivered: u64,
    pub dropped: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub publish_failures: u64,
    pub statuses_applied: u64,
    /// Updates that matched no job row.
    pub missing_rows: u64,
    pub requeued: u64,
}

/// Observer backed by atomic counters.
#[derive(Debug, Default)]
pub struct CountingObserver {
    received: AtomicU64,
    redelivered: AtomicU64,
    dropped: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    publish_failures: AtomicU64,
    statuses_applied: AtomicU64,
    missing_rows: AtomicU64,
    requeued: AtomicU64,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PipelineCounts {
        PipelineCounts {
            received: self.received.load(Ordering::Relaxed),
            redelivered: self.redelivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            statuses_applied: self.statuses_applied.load(Ordering::Relaxed),
            missing_rows: self.missing_rows.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl PipelineObserver for CountingObserver {
    fn message_received(&self, _queue: QueueName, redelivered: bool) {
        bump(&self.received);
        if redelivered {
            bump(&self.redelivered);
        }
    }

    fn message_dropped(&self, _queue: QueueName) {
        bump(&self.dropped);
    }

    fn job_finished(&self, _job_type: &str, status: JobStatus, _elapsed: Duration) {
        match status {
            JobStatus::Completed => bump(&self.jobs_completed),
            JobStatus::Failed => bump(&self.jobs_failed),
            JobStatus::Running => {}
        }
    }

    fn publish_failed(&self, _queue: QueueName) {
        bump(&self.publish_failures);
    }

    fn status_applied(&self, _status: JobStatus, rows: u64) {
        if rows == 0 {
            bump(&self.missing_rows);
        } else {
            bump(&self.statuses_applied);
        }
    }

    fn status_requeued(&self) {
        bump(&self.requeued);
    }
}
