//! JobMessage - the unit of work published on `jobs.created`.

use serde::{Deserialize, Serialize};

use super::ids::JobId;

/// A job as submitted by the producer.
///
/// `payload` is itself a serialized JSON object whose schema belongs to the
/// handler registered for `job_type`. Unknown top-level fields (for example a
/// `userId` added by the submission service) are ignored.
///
/// Wire shape:
/// ```json
/// {"jobId":"j1","type":"sleep","payload":"{\"seconds\":2}"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    pub job_id: JobId,

    #[serde(rename = "type")]
    pub job_type: String,

    pub payload: String,
}

impl JobMessage {
    pub fn new(job_id: JobId, job_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            job_id,
            job_type: job_type.into(),
            payload: payload.into(),
        }
    }

    /// Decode a message body. Any error here means the body is malformed and
    /// can never be processed.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
