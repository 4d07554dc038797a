// crates/resilience/src/error.rs
//! Error types for resilience operations

use crate::circuit_breaker::CircuitState;
use crate::classify::{Classify, FailureClass};
use std::time::Duration;
use thiserror::Error;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Why a [`Context`](crate::Context) stopped waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context was canceled explicitly
    #[error("context canceled")]
    Canceled,

    /// The context deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Admission refused by a circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circuit breaker is {state} (retry in {retry_in:?})")]
pub struct CircuitOpenError {
    /// Breaker state at the moment of refusal
    pub state: CircuitState,
    /// Time left until an open breaker starts probing, if known
    pub retry_in: Option<Duration>,
}

/// Errors that can occur in resilience operations
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// Waiting was interrupted by the caller's context
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Circuit breaker refused the call
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// The wrapped operation failed
    #[error("operation failed ({class:?}): {message}")]
    Operation {
        class: FailureClass,
        message: String,
        retry_after: Option<Duration>,
    },
}

impl ResilienceError {
    /// Creates an operation failure with the given classification
    pub fn operation(class: FailureClass, message: impl Into<String>) -> Self {
        ResilienceError::Operation {
            class,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Attaches a server supplied retry hint to an operation failure
    pub fn with_retry_after(self, hint: Duration) -> Self {
        match self {
            ResilienceError::Operation { class, message, .. } => ResilienceError::Operation {
                class,
                message,
                retry_after: Some(hint),
            },
            other => other,
        }
    }
}

impl Classify for ContextError {
    fn failure_class(&self) -> FailureClass {
        match self {
            ContextError::Canceled => FailureClass::Canceled,
            ContextError::DeadlineExceeded => FailureClass::DeadlineExceeded,
        }
    }
}

impl Classify for CircuitOpenError {
    fn failure_class(&self) -> FailureClass {
        FailureClass::Rejected
    }
}

impl Classify for ResilienceError {
    fn failure_class(&self) -> FailureClass {
        match self {
            ResilienceError::Context(e) => e.failure_class(),
            ResilienceError::CircuitOpen(e) => e.failure_class(),
            ResilienceError::Operation { class, .. } => *class,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ResilienceError::Operation { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_error_display() {
        assert_eq!(ContextError::Canceled.to_string(), "context canceled");
        assert!(ContextError::DeadlineExceeded.to_string().contains("deadline"));
    }

    #[test]
    fn test_circuit_open_error() {
        let err = CircuitOpenError {
            state: CircuitState::Open,
            retry_in: Some(Duration::from_secs(10)),
        };
        assert!(err.to_string().contains("open"));
        assert!(err.to_string().contains("10s"));
        assert_eq!(err.failure_class(), FailureClass::Rejected);
    }

    #[test]
    fn test_operation_error_classification() {
        let err = ResilienceError::operation(FailureClass::Status(503), "unavailable")
            .with_retry_after(Duration::from_secs(2));
        assert_eq!(err.failure_class(), FailureClass::Status(503));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn test_context_error_converts() {
        let err: ResilienceError = ContextError::Canceled.into();
        assert_eq!(err.failure_class(), FailureClass::Canceled);
        assert_eq!(err.retry_after(), None);
    }
}
