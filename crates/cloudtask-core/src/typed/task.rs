//! Task trait - binds a job `type` tag to a payload schema.

use serde::de::DeserializeOwned;

use crate::domain::JobFailure;

/// Task ties a `type` tag to the payload it is decoded from.
///
/// # Example
/// ```ignore
/// #[derive(Deserialize)]
/// struct ResizeTask {
///     width: u32,
/// }
///
/// impl Task for ResizeTask {
///     const TYPE: &'static str = "resize";
/// }
/// ```
///
/// # Trait Bounds
/// - `DeserializeOwned`: decoded from the message's `payload` string
/// - `Send + Sync + 'static`: handlers live behind `Arc` in the registry
pub trait Task: DeserializeOwned + Send + Sync + 'static {
    /// The `type` tag of job messages carrying this task.
    const TYPE: &'static str;

    /// Range and consistency checks that serde cannot express.
    fn validate(&self) -> Result<(), JobFailure> {
        Ok(())
    }
}
