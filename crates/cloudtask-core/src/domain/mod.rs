//! Domain model: job identifiers, the messages that travel between queues,
//! job outcomes and job-level failures.
//!
//! Nothing in here knows about brokers or databases. The wire shapes are plain
//! serde structs so every adapter speaks the same JSON.

pub mod errors;
pub mod ids;
pub mod message;
pub mod outcome;
pub mod queue;
pub mod status;

pub use self::errors::{FailureKind, JobFailure};
pub use self::ids::JobId;
pub use self::message::JobMessage;
pub use self::outcome::JobOutcome;
pub use self::queue::QueueName;
pub use self::status::{JobStatus, StatusUpdate};
