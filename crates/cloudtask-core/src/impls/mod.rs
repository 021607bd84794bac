//! Impls - adapters for the ports.
//!
//! - **InMemoryBroker / InMemoryChannel**: in-process broker (dev, tests)
//! - **InMemoryJobStore**: `HashMap` job table (dev, tests)
//! - **RedisStreamsChannel**: production broker (feature `redis`)
//! - **PostgresJobStore**: production job store (feature `postgres`)

pub mod inmem_channel;
pub mod inmem_store;
#[cfg(feature = "postgres")]
pub mod pg_store;
#[cfg(feature = "redis")]
pub mod redis_channel;

pub use self::inmem_channel::{InMemoryBroker, InMemoryChannel};
pub use self::inmem_store::{InMemoryJobStore, JobRow};
#[cfg(feature = "postgres")]
pub use self::pg_store::PostgresJobStore;
#[cfg(feature = "redis")]
pub use self::redis_channel::{RedisChannelConfig, RedisStreamsChannel};
