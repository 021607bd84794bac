//! JobStore port - the persistent job table.

use async_trait::async_trait;

use crate::domain::{JobId, JobStatus};
use crate::error::StoreError;

/// Durable record of each job's current status.
///
/// Rows are created by the submission path, never here. `update_status` is an
/// unconditional overwrite keyed by job id (last write wins):
///
/// ```sql
/// UPDATE jobs SET status = :status, updated_at = now() WHERE id = :job_id
/// ```
///
/// Applying the same update twice leaves the same status behind; only
/// `updated_at` moves. A job id with no row is not an error: the call
/// succeeds with zero affected rows.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Returns the number of rows updated (0 or 1).
    async fn update_status(&self, job_id: &JobId, status: JobStatus) -> Result<u64, StoreError>;
}
