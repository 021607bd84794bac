//! Handler trait - runs one decoded task.

use async_trait::async_trait;
use std::marker::PhantomData;

use super::task::Task;
use crate::domain::JobFailure;

/// Handler executes a task and returns its human-readable result.
///
/// # Example
/// ```ignore
/// struct ResizeHandler;
///
/// #[async_trait]
/// impl Handler<ResizeTask> for ResizeHandler {
///     async fn handle(&self, task: ResizeTask) -> Result<String, JobFailure> {
///         Ok(format!("resized to {}", task.width))
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T) -> Result<String, JobFailure>;
}

/// Object-safe handler over the raw payload string.
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, payload: &str) -> Result<String, JobFailure>;

    fn job_type(&self) -> &'static str;
}

/// Adapts a `Handler<T>` into a `DynHandler`: decode, validate, run.
pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(&self, payload: &str) -> Result<String, JobFailure> {
        let task: T =
            serde_json::from_str(payload).map_err(|e| JobFailure::invalid_payload(T::TYPE, e))?;
        task.validate()?;
        self.handler.handle(task).await
    }

    fn job_type(&self) -> &'static str {
        T::TYPE
    }
}
