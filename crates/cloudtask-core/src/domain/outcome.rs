//! JobOutcome - what running one job produced.

use super::errors::JobFailure;
use super::ids::JobId;
use super::status::{JobStatus, StatusUpdate};

/// Terminal result of a job execution.
///
/// Both variants are ordinary outcomes: either way a terminal status update is
/// published and the inbound message is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(String),
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed(_) => JobStatus::Completed,
            JobOutcome::Failed(_) => JobStatus::Failed,
        }
    }

    pub fn into_status_update(self, job_id: JobId) -> StatusUpdate {
        match self {
            JobOutcome::Completed(result) => StatusUpdate::completed(job_id, result),
            JobOutcome::Failed(failure) => StatusUpdate::failed(job_id, failure.to_string()),
        }
    }
}

impl From<Result<String, JobFailure>> for JobOutcome {
    fn from(result: Result<String, JobFailure>) -> Self {
        match result {
            Ok(output) => JobOutcome::Completed(output),
            Err(failure) => JobOutcome::Failed(failure),
        }
    }
}
