//! Job-level failures.
//!
//! A `JobFailure` is a normal outcome of running a job, not an error of the
//! pipeline. It ends up as the `result` of a `FAILED` status update and the
//! inbound message is still acknowledged.

use thiserror::Error;

/// Classification of a job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No handler registered for the job type.
    UnknownType,
    /// The payload could not be decoded into the handler's task type.
    InvalidPayload,
    /// The payload decoded but its values are out of range.
    Validation,
    /// The handler ran and failed.
    Execution,
}

/// A failed job. `Display` is the human-readable description that gets
/// published as the status update's `result`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct JobFailure {
    kind: FailureKind,
    message: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_type(job_type: &str) -> Self {
        Self::new(FailureKind::UnknownType, format!("unknown job type: {job_type}"))
    }

    pub fn invalid_payload(job_type: &str, err: impl std::fmt::Display) -> Self {
        Self::new(
            FailureKind::InvalidPayload,
            format!("invalid {job_type} payload: {err}"),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Execution, message)
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        let f = JobFailure::unknown_type("unknown-xyz");
        assert_eq!(f.to_string(), "unknown job type: unknown-xyz");
        assert_eq!(f.kind(), FailureKind::UnknownType);
    }

    #[test]
    fn invalid_payload_names_the_type() {
        let f = JobFailure::invalid_payload("sleep", "missing field `seconds`");
        assert_eq!(f.message(), "invalid sleep payload: missing field `seconds`");
    }
}
