//! Typed - the job handler API.
//!
//! Two layers:
//! - **Typed**: `Task` and `Handler<T>`. A handler receives its own decoded,
//!   validated task type.
//! - **Dyn**: `DynHandler`, the object-safe form stored in the
//!   `HandlerRegistry` and keyed by the job's `type` tag.
//!
//! Adding a job type means adding a `Task` + `Handler` pair and registering
//! it at startup; nothing central is edited.

pub mod handler;
pub mod registry;
pub mod task;

pub use self::handler::{DynHandler, Handler, TypedHandler};
pub use self::registry::{HandlerRegistry, RegistryError};
pub use self::task::Task;

#[cfg(test)]
pub(crate) mod testing;
