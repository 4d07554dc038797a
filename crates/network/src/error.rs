// crates/network/src/error.rs
//! Error types for API calls

use std::time::Duration;
use thiserror::Error;
use threadline_resilience::{CircuitOpenError, Classify, ContextError, FailureClass};

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Longest response body excerpt kept in a `BadRequest` message
const BODY_EXCERPT_LEN: usize = 200;

/// The transport failed before any response arrived
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    timeout: bool,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// Creates a transport error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: false,
            source: None,
        }
    }

    /// Returns true if the transport gave up waiting for the upstream
    pub fn is_timeout(&self) -> bool {
        self.timeout
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            timeout: err.is_timeout(),
            source: Some(Box::new(err)),
        }
    }
}

/// Coarse classification of an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ContextCanceled,
    Network,
    RateLimitExceeded,
    Auth,
    NotFound,
    BadRequest,
    Server,
    Http,
    CircuitOpen,
    Credential,
    Decode,
    InvalidRequest,
}

/// Errors that can occur during API calls
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller's context was canceled or expired
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Transport failure, no response
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// HTTP 429
    #[error("rate limit exceeded (HTTP 429)")]
    RateLimitExceeded { retry_after: Option<Duration> },

    /// HTTP 401
    #[error("authentication rejected (HTTP 401)")]
    Auth,

    /// HTTP 404
    #[error("resource not found (HTTP 404)")]
    NotFound,

    /// HTTP 400
    #[error("bad request (HTTP 400): {message}")]
    BadRequest { message: String },

    /// HTTP 5xx
    #[error("server error (HTTP {status})")]
    Server {
        status: u16,
        retry_after: Option<Duration>,
    },

    /// Any other non-success status
    #[error("unexpected HTTP status {status}")]
    Http {
        status: u16,
        retry_after: Option<Duration>,
    },

    /// The circuit breaker refused the call
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// Every attempt failed; carries the last attempt's error
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<ApiError> },

    /// The auth collaborator could not supply a credential
    #[error("credential unavailable: {0}")]
    Credential(String),

    /// The response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Maps a non-success status to its error
    pub fn from_status(status: u16, retry_after: Option<Duration>, body: &[u8]) -> Self {
        match status {
            400 => {
                let text = String::from_utf8_lossy(body);
                ApiError::BadRequest {
                    message: text.chars().take(BODY_EXCERPT_LEN).collect(),
                }
            }
            401 => ApiError::Auth,
            404 => ApiError::NotFound,
            429 => ApiError::RateLimitExceeded { retry_after },
            500..=599 => ApiError::Server {
                status,
                retry_after,
            },
            _ => ApiError::Http {
                status,
                retry_after,
            },
        }
    }

    /// Returns the coarse kind, looking through `RetriesExhausted`
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Context(_) => ErrorKind::ContextCanceled,
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            ApiError::Auth => ErrorKind::Auth,
            ApiError::NotFound => ErrorKind::NotFound,
            ApiError::BadRequest { .. } => ErrorKind::BadRequest,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Http { .. } => ErrorKind::Http,
            ApiError::CircuitOpen(_) => ErrorKind::CircuitOpen,
            ApiError::RetriesExhausted { last, .. } => last.kind(),
            ApiError::Credential(_) => ErrorKind::Credential,
            ApiError::Decode(_) => ErrorKind::Decode,
            ApiError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// HTTP status behind this error, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RateLimitExceeded { .. } => Some(429),
            ApiError::Auth => Some(401),
            ApiError::NotFound => Some(404),
            ApiError::BadRequest { .. } => Some(400),
            ApiError::Server { status, .. } | ApiError::Http { status, .. } => Some(*status),
            ApiError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Returns true if the default retry policy would retry this error
    pub fn is_retryable(&self) -> bool {
        match self.failure_class() {
            FailureClass::Transport => true,
            FailureClass::Status(code) => {
                threadline_resilience::DEFAULT_RETRYABLE_STATUS_CODES.contains(&code)
            }
            _ => false,
        }
    }
}

impl Classify for ApiError {
    fn failure_class(&self) -> FailureClass {
        match self {
            ApiError::Context(err) => err.failure_class(),
            ApiError::Network(_) => FailureClass::Transport,
            ApiError::CircuitOpen(_) => FailureClass::Rejected,
            ApiError::RetriesExhausted { last, .. } => last.failure_class(),
            ApiError::Credential(_) | ApiError::Decode(_) | ApiError::InvalidRequest(_) => {
                FailureClass::Local
            }
            status_error => match status_error.status() {
                Some(status) => FailureClass::Status(status),
                None => FailureClass::Local,
            },
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimitExceeded { retry_after }
            | ApiError::Server { retry_after, .. }
            | ApiError::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
