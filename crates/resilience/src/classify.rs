// crates/resilience/src/classify.rs
//! Call outcome classification shared by the breaker and the retry loop

use std::time::Duration;

/// How a failed call should be treated by resilience components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// No response was received (connect, reset, transport timeout)
    Transport,
    /// The upstream answered with a non-success status code
    Status(u16),
    /// The caller's deadline passed
    DeadlineExceeded,
    /// The caller canceled the call
    Canceled,
    /// A resilience component refused the call before it was issued
    Rejected,
    /// The call failed on this side of the wire (bad input, undecodable body)
    Local,
}

impl FailureClass {
    /// Returns true for 5xx status codes
    pub fn is_server_error(&self) -> bool {
        matches!(self, FailureClass::Status(code) if (500..=599).contains(code))
    }

    /// Returns true for 4xx status codes
    pub fn is_client_error(&self) -> bool {
        matches!(self, FailureClass::Status(code) if (400..=499).contains(code))
    }
}

/// Errors that resilience components know how to judge
pub trait Classify {
    /// Classifies this error
    fn failure_class(&self) -> FailureClass;

    /// Server supplied hint for how long to wait before retrying
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Default circuit breaker trip policy.
///
/// Trips on transport failures, 5xx responses and deadline expiry. Client
/// errors (4xx) describe a bad request rather than an unhealthy upstream and
/// never trip.
pub fn default_should_trip(class: &FailureClass) -> bool {
    match class {
        FailureClass::Transport | FailureClass::DeadlineExceeded => true,
        FailureClass::Status(_) => class.is_server_error(),
        FailureClass::Canceled | FailureClass::Rejected | FailureClass::Local => false,
    }
}
