//! PostgresJobStore - the production job store.
//!
//! Only the status overwrite lives here; the `jobs` table and its rows belong
//! to the submission service. `id` is compared as text so both `uuid` and
//! `text` id columns work with opaque job ids.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::instrument;

use crate::domain::{JobId, JobStatus};
use crate::error::StoreError;
use crate::ports::JobStore;

const UPDATE_STATUS_SQL: &str =
    "UPDATE jobs SET status = $1, updated_at = now() WHERE id::text = $2";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and check it with `SELECT 1`.
    #[instrument(skip(url), err)]
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
            .connect(url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn update_status(&self, job_id: &JobId, status: JobStatus) -> Result<u64, StoreError> {
        let result = sqlx::query(UPDATE_STATUS_SQL)
            .bind(status.as_str())
            .bind(job_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
