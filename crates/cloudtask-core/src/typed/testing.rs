//! Test-only task types.

use async_trait::async_trait;
use serde::Deserialize;

use super::handler::Handler;
use super::task::Task;
use crate::domain::JobFailure;

#[derive(Debug, Clone, Deserialize)]
pub struct EchoTask {
    pub text: String,
}

impl Task for EchoTask {
    const TYPE: &'static str = "echo";

    fn validate(&self) -> Result<(), JobFailure> {
        if self.text.is_empty() {
            return Err(JobFailure::validation("text must not be empty"));
        }
        Ok(())
    }
}

pub struct EchoHandler;

#[async_trait]
impl Handler<EchoTask> for EchoHandler {
    async fn handle(&self, task: EchoTask) -> Result<String, JobFailure> {
        Ok(format!("echo: {}", task.text))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoomTask {}

impl Task for BoomTask {
    const TYPE: &'static str = "boom";
}

pub struct BoomHandler;

#[async_trait]
impl Handler<BoomTask> for BoomHandler {
    async fn handle(&self, _task: BoomTask) -> Result<String, JobFailure> {
        Err(JobFailure::execution("boom handler always fails"))
    }
}
