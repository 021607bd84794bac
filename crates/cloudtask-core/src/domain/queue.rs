//! The three named durable queues of the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueueName {
    /// New jobs, consumed by workers.
    #[serde(rename = "jobs.created")]
    JobsCreated,
    /// `RUNNING` updates, consumed by the results processor.
    #[serde(rename = "jobs.started")]
    JobsStarted,
    /// `COMPLETED` / `FAILED` updates, consumed by the results processor.
    #[serde(rename = "jobs.completed")]
    JobsCompleted,
}

impl QueueName {
    pub const ALL: [QueueName; 3] = [
        QueueName::JobsCreated,
        QueueName::JobsStarted,
        QueueName::JobsCompleted,
    ];

    pub fn parse(name: &str) -> Option<QueueName> {
        QueueName::ALL.into_iter().find(|q| q.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::JobsCreated => "jobs.created",
            QueueName::JobsStarted => "jobs.started",
            QueueName::JobsCompleted => "jobs.completed",
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for q in QueueName::ALL {
            assert_eq!(QueueName::parse(q.as_str()), Some(q));
        }
        assert_eq!(QueueName::parse("jobs.deleted"), None);
        assert_eq!(QueueName::JobsStarted.to_string(), "jobs.started");
    }
}
