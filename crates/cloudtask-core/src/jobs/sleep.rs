//! `sleep` job: waits for a number of seconds.
//!
//! The wait holds the worker's only consumption loop, so no other message is
//! processed by that worker until it ends. Shutdown does not interrupt it.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::JobFailure;
use crate::typed::{Handler, Task};

pub const MIN_SECONDS: i64 = 1;
pub const MAX_SECONDS: i64 = 300;

/// Payload: `{"seconds": <integer>}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SleepTask {
    pub seconds: i64,
}

impl Task for SleepTask {
    const TYPE: &'static str = "sleep";

    fn validate(&self) -> Result<(), JobFailure> {
        if !(MIN_SECONDS..=MAX_SECONDS).contains(&self.seconds) {
            return Err(JobFailure::validation(format!(
                "seconds must be between {MIN_SECONDS} and {MAX_SECONDS}, got {}",
                self.seconds
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SleepHandler;

#[async_trait]
impl Handler<SleepTask> for SleepHandler {
    async fn handle(&self, task: SleepTask) -> Result<String, JobFailure> {
        debug!(seconds = task.seconds, "sleeping");
        // validate() guarantees 1..=300
        tokio::time::sleep(Duration::from_secs(task.seconds.unsigned_abs())).await;
        Ok(format!("Slept for {} seconds", task.seconds))
    }
}
