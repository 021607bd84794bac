use thiserror::Error;

use crate::domain::QueueName;

/// Errors raised by a message channel adapter.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("queue {0} has not been declared")]
    QueueNotDeclared(QueueName),

    #[error("delivery {0} is no longer outstanding")]
    UnknownDelivery(String),

    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("broker command error: {0}")]
    Command(String),

    #[error("malformed broker reply: {0}")]
    Protocol(String),

    #[error("invalid channel configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised by a job store adapter.
///
/// Every variant is treated as transient by the results processor: the
/// status update is requeued and retried on redelivery.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job store unavailable: {0}")]
    Unavailable(String),

    #[error("job store statement failed: {0}")]
    Statement(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for ChannelError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
            ChannelError::Connection(err.to_string())
        } else {
            ChannelError::Command(err.to_string())
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Statement(other.to_string()),
        }
    }
}
