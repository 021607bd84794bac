//! InMemoryJobStore - job table kept in a `HashMap`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{JobId, JobStatus};
use crate::error::StoreError;
use crate::ports::{Clock, JobStore, SystemClock};

/// Status a row carries before any update arrives.
pub const CREATED_STATUS: &str = "CREATED";

/// One job row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRow {
    pub id: JobId,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

pub struct InMemoryJobStore {
    rows: Mutex<HashMap<JobId, JobRow>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<JobId, JobRow>> {
        self.rows.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Create the row for a freshly submitted job, as the submission path would.
    pub fn insert_created(&self, id: JobId) -> JobRow {
        let row = JobRow {
            id: id.clone(),
            status: CREATED_STATUS.to_string(),
            updated_at: self.clock.now(),
        };
        self.rows().insert(id, row.clone());
        row
    }

    pub fn get(&self, id: &JobId) -> Option<JobRow> {
        self.rows().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn update_status(&self, job_id: &JobId, status: JobStatus) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut rows = self.rows();
        let Some(row) = rows.get_mut(job_id) else {
            return Ok(0);
        };
        row.status = status.as_str().to_string();
        row.updated_at = now;
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::{Duration, TimeZone};

    fn store() -> (Arc<FixedClock>, InMemoryJobStore) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let store = InMemoryJobStore::with_clock(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn update_overwrites_status_and_timestamp() {
        let (clock, store) = store();
        let id = JobId::new("j1");
        let created = store.insert_created(id.clone());
        assert_eq!(created.status, CREATED_STATUS);

        clock.advance(Duration::seconds(3));
        let rows = store.update_status(&id, JobStatus::Running).await.unwrap();
        assert_eq!(rows, 1);

        let row = store.get(&id).unwrap();
        assert_eq!(row.status, "RUNNING");
        assert_eq!(row.updated_at, created.updated_at + Duration::seconds(3));
    }

    #[tokio::test]
    async fn reapplying_same_update_only_moves_timestamp() {
        let (clock, store) = store();
        let id = JobId::new("j1");
        store.insert_created(id.clone());

        store.update_status(&id, JobStatus::Completed).await.unwrap();
        let once = store.get(&id).unwrap();

        clock.advance(Duration::seconds(1));
        store.update_status(&id, JobStatus::Completed).await.unwrap();
        let twice = store.get(&id).unwrap();

        assert_eq!(once.status, twice.status);
        assert!(twice.updated_at > once.updated_at);
    }

    #[tokio::test]
    async fn missing_row_is_zero_rows_not_an_error() {
        let (_, store) = store();
        let rows = store
            .update_status(&JobId::new("ghost"), JobStatus::Failed)
            .await
            .unwrap();
        assert_eq!(rows, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn last_write_wins_even_after_a_terminal_status() {
        let (_, store) = store();
        let id = JobId::new("j1");
        store.insert_created(id.clone());

        store.update_status(&id, JobStatus::Completed).await.unwrap();
        let rows = store.update_status(&id, JobStatus::Running).await.unwrap();

        assert_eq!(rows, 1);
        assert_eq!(store.get(&id).unwrap().status, "RUNNING");
    }
}
