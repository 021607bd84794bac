//! PipelineObserver port - metrics hooks injected into the consumption loops.
//!
//! Every hook has an empty default body, so an implementation only overrides
//! what it records. The loops never depend on a live metrics backend.

use std::time::Duration;

use crate::domain::{JobStatus, QueueName};

pub trait PipelineObserver: Send + Sync {
    /// A message was taken off `queue`.
    fn message_received(&self, _queue: QueueName, _redelivered: bool) {}

    /// A malformed message was rejected without requeue.
    fn message_dropped(&self, _queue: QueueName) {}

    /// A job finished executing (successfully or not).
    fn job_finished(&self, _job_type: &str, _status: JobStatus, _elapsed: Duration) {}

    /// A best-effort status publish failed.
    fn publish_failed(&self, _queue: QueueName) {}

    /// A status update was written to the job store, touching `rows` rows.
    fn status_applied(&self, _status: JobStatus, _rows: u64) {}

    /// A status update was requeued after a job store error.
    fn status_requeued(&self) {}
}

/// Observer that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}
