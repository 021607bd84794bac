//! cloudtask-core
//!
//! Core of the cloudtask job pipeline: a worker that executes submitted jobs
//! and a results processor that records their status.
//!
//! ```text
//! producer ─► jobs.created ─► Worker ─┬─► jobs.started ───┐
//!                                     └─► jobs.completed ─┴─► ResultsProcessor ─► jobs table
//! ```
//!
//! # Modules
//! - **domain**: wire messages (JobMessage, StatusUpdate), queue names, job failures
//! - **ports**: seams to the outside (MessageChannel/Delivery, JobStore, Clock, PipelineObserver)
//! - **typed**: typed job API (Task trait, Handler trait, HandlerRegistry)
//! - **jobs**: built-in job types (sleep)
//! - **app**: the consumption loops (WorkerBuilder/Worker, ResultsProcessor)
//! - **impls**: in-memory broker and store; Redis Streams and Postgres behind
//!   the `redis` and `postgres` features
//! - **observability**: counting observer
//! - **error**: channel and store errors

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod jobs;
pub mod observability;
pub mod ports;
pub mod typed;
