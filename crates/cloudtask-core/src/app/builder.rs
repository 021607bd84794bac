//! WorkerBuilder - assembles a `Worker` and checks its registry at startup.
//!
//! # Example
//! ```ignore
//! let worker = WorkerBuilder::new()
//!     .with_builtin_jobs()?
//!     .expect_job_types(&["sleep"])
//!     .observer(observer)
//!     .build(channel)?;
//! ```
//!
//! `build` fails fast when a job type listed in `expect_job_types` has no
//! handler, instead of failing every such job at runtime as "unknown job type".

use std::sync::Arc;

use super::worker_loop::Worker;
use crate::jobs::{SleepHandler, SleepTask};
use crate::ports::{MessageChannel, NoopObserver, PipelineObserver};
use crate::typed::{Handler, HandlerRegistry, RegistryError, Task};

pub struct WorkerBuilder {
    registry: HandlerRegistry,
    expected_job_types: Option<Vec<String>>,
    observer: Arc<dyn PipelineObserver>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing job types: {0:?}. These job types were expected but not registered.")]
    MissingJobTypes(Vec<String>),
}

impl WorkerBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            expected_job_types: None,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    /// Register every job type that ships with this crate.
    pub fn with_builtin_jobs(self) -> Result<Self, RegistryError> {
        self.register::<SleepTask, _>(SleepHandler)
    }

    /// Job types that must have a handler by the time `build` runs.
    pub fn expect_job_types(mut self, job_types: &[&str]) -> Self {
        self.expected_job_types = Some(job_types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self, channel: Arc<dyn MessageChannel>) -> Result<Worker, BuildError> {
        if let Some(expected) = &self.expected_job_types {
            let registered = self.registry.registered_types();
            let missing: Vec<String> = expected
                .iter()
                .filter(|t| !registered.contains(t))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingJobTypes(missing));
            }
        }
        Ok(Worker::new(channel, Arc::new(self.registry), self.observer))
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryBroker;
    use crate::typed::testing::{BoomTask, EchoHandler, EchoTask};

    fn channel() -> Arc<dyn MessageChannel> {
        Arc::new(InMemoryBroker::new().channel())
    }

    #[test]
    fn test_build_success() {
        let worker = WorkerBuilder::new()
            .register::<EchoTask, _>(EchoHandler)
            .unwrap()
            .expect_job_types(&[EchoTask::TYPE])
            .build(channel());
        assert!(worker.is_ok());
    }

    #[test]
    fn test_build_missing_job_types() {
        let worker = WorkerBuilder::new()
            .register::<EchoTask, _>(EchoHandler)
            .unwrap()
            .expect_job_types(&[EchoTask::TYPE, BoomTask::TYPE])
            .build(channel());
        assert!(matches!(
            worker,
            Err(BuildError::MissingJobTypes(missing)) if missing == vec![BoomTask::TYPE.to_string()]
        ));
    }

    #[test]
    fn test_build_without_expectations() {
        let worker = WorkerBuilder::new().build(channel()).unwrap();
        assert!(worker.registry().registered_types().is_empty());
    }

    #[test]
    fn test_builtin_jobs_include_sleep() {
        let worker = WorkerBuilder::new()
            .with_builtin_jobs()
            .unwrap()
            .expect_job_types(&["sleep"])
            .build(channel())
            .unwrap();
        assert_eq!(worker.registry().registered_types(), vec!["sleep"]);
    }

    #[test]
    fn test_register_twice_fails() {
        let result = WorkerBuilder::new()
            .with_builtin_jobs()
            .unwrap()
            .with_builtin_jobs();
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(t)) if t == "sleep"));
    }
}
