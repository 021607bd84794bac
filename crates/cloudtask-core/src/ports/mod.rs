//! Ports - the seams between the pipeline and its external collaborators.
//!
//! - **MessageChannel / Delivery**: the broker (Redis Streams in production,
//!   in-memory for tests)
//! - **JobStore**: the relational job table (PostgreSQL in production)
//! - **Clock**: time source for store timestamps
//! - **PipelineObserver**: metrics hooks

pub mod channel;
pub mod clock;
pub mod job_store;
pub mod observer;

pub use self::channel::{Delivery, MessageChannel};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::job_store::JobStore;
pub use self::observer::{NoopObserver, PipelineObserver};
