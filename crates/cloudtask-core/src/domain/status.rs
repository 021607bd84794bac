//! Status updates published on `jobs.started` / `jobs.completed`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::JobId;
use super::queue::QueueName;

/// Lifecycle status carried by a status update.
///
/// `CREATED` is not a variant: it is implied by the existence of the job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle transition of a job.
///
/// `result` is present only for terminal statuses: the handler output for
/// `COMPLETED`, the failure description for `FAILED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub job_id: JobId,
    pub status: JobStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl StatusUpdate {
    pub fn running(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Running,
            result: None,
        }
    }

    pub fn completed(job_id: JobId, result: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobStatus::Completed,
            result: Some(result.into()),
        }
    }

    pub fn failed(job_id: JobId, reason: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobStatus::Failed,
            result: Some(reason.into()),
        }
    }

    /// Queue this update is published to.
    pub fn queue(&self) -> QueueName {
        if self.status.is_terminal() {
            QueueName::JobsCompleted
        } else {
            QueueName::JobsStarted
        }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_update_has_no_result_field() {
        let body = StatusUpdate::running(JobId::new("j1")).to_vec().unwrap();
        assert_eq!(body, br#"{"jobId":"j1","status":"RUNNING"}"#);
    }

    #[test]
    fn completed_update_wire_shape() {
        let body = StatusUpdate::completed(JobId::new("j1"), "Slept for 2 seconds")
            .to_vec()
            .unwrap();
        assert_eq!(
            body,
            br#"{"jobId":"j1","status":"COMPLETED","result":"Slept for 2 seconds"}"#
        );
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(StatusUpdate::from_slice(br#"{"jobId":"j1","status":"PENDING"}"#).is_err());
        assert!(StatusUpdate::from_slice(br#"{"status":"RUNNING"}"#).is_err());
    }

    #[test]
    fn routes_by_status() {
        let id = JobId::new("j1");
        assert_eq!(StatusUpdate::running(id.clone()).queue(), QueueName::JobsStarted);
        assert_eq!(StatusUpdate::completed(id.clone(), "ok").queue(), QueueName::JobsCompleted);
        assert_eq!(StatusUpdate::failed(id, "no").queue(), QueueName::JobsCompleted);
    }
}
