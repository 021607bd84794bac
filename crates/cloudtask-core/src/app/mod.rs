//! App - the two consumption loops of the pipeline.
//!
//! # Components
//! - **consumer**: the sequential receive → handle → resolve loop, with
//!   cooperative shutdown
//! - **WorkerBuilder / Worker**: consumes `jobs.created`, runs jobs, publishes
//!   `RUNNING` and `COMPLETED`/`FAILED`
//! - **ResultsProcessor**: consumes `jobs.started` + `jobs.completed` and
//!   writes each status to the job store
//!
//! Each loop handles one message at a time. Throughput comes from running more
//! processes against the same queues.

pub mod builder;
pub mod consumer;
pub mod results_loop;
pub mod worker_loop;


pub use self::builder::{BuildError, WorkerBuilder};
pub use self::consumer::{DeliveryHandler, Disposition, consume};
pub use self::results_loop::ResultsProcessor;
pub use self::worker_loop::Worker;
