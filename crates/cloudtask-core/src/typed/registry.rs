//! HandlerRegistry - job type to handler mapping, built at process start.
//!
//! Mutable while the worker is being assembled, shared read-only (`Arc`) once
//! the consumption loop runs, so lookups need no locks.

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{DynHandler, Handler, TypedHandler};
use super::task::Task;
use crate::domain::{JobFailure, JobMessage, JobOutcome};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for job type '{0}' is already registered")]
    AlreadyRegistered(String),
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn DynHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(T::TYPE) {
            return Err(RegistryError::AlreadyRegistered(T::TYPE.to_string()));
        }
        self.handlers
            .insert(T::TYPE, Arc::new(TypedHandler::<T, H>::new(handler)));
        Ok(())
    }

    pub fn get(&self, job_type: &str) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(job_type).cloned()
    }

    /// Registered type tags, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().map(|t| t.to_string()).collect();
        types.sort();
        types
    }

    /// Run `message` through the handler registered for its type.
    ///
    /// Never fails: an unknown type, a bad payload or a handler error all come
    /// back as `JobOutcome::Failed`.
    pub async fn dispatch(&self, message: &JobMessage) -> JobOutcome {
        let Some(handler) = self.get(&message.job_type) else {
            return JobOutcome::Failed(JobFailure::unknown_type(&message.job_type));
        };
        handler.handle_dyn(&message.payload).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureKind, JobId};
    use crate::typed::testing::{BoomHandler, BoomTask, EchoHandler, EchoTask};

    fn registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register::<EchoTask, _>(EchoHandler).unwrap();
        registry.register::<BoomTask, _>(BoomHandler).unwrap();
        registry
    }

    #[test]
    fn test_register_and_get() {
        let registry = registry();
        assert!(registry.get(EchoTask::TYPE).is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_double_registration() {
        let mut registry = HandlerRegistry::new();
        registry.register::<EchoTask, _>(EchoHandler).unwrap();
        let result = registry.register::<EchoTask, _>(EchoHandler);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(t)) if t == "echo"));
    }

    #[test]
    fn test_registered_types_sorted() {
        assert_eq!(registry().registered_types(), vec!["boom", "echo"]);
    }

    #[tokio::test]
    async fn dispatch_unknown_type_fails_naming_it() {
        let msg = JobMessage::new(JobId::new("j9"), "unknown-xyz", "{}");
        let outcome = registry().dispatch(&msg).await;
        match outcome {
            JobOutcome::Failed(f) => {
                assert_eq!(f.kind(), FailureKind::UnknownType);
                assert!(f.message().contains("unknown-xyz"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_handler_error_is_failed_outcome() {
        let msg = JobMessage::new(JobId::new("j3"), "boom", "{}");
        let outcome = registry().dispatch(&msg).await;
        assert_eq!(
            outcome,
            JobOutcome::Failed(JobFailure::execution("boom handler always fails"))
        );
    }

    #[tokio::test]
    async fn dispatch_success() {
        let msg = JobMessage::new(JobId::new("j1"), "echo", r#"{"text":"x"}"#);
        let outcome = registry().dispatch(&msg).await;
        assert_eq!(outcome, JobOutcome::Completed("echo: x".to_string()));
    }
}
