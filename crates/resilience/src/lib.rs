// crates/resilience/src/lib.rs
//! Resilience patterns for calls to a rate-limited upstream
//!
//! This module provides:
//! - An adaptive token bucket rate limiter
//! - A circuit breaker with lazy half-open probing
//! - Retry with exponential backoff, jitter and `Retry-After` support
//! - A cancellation [`Context`] observed by every wait
//!
//! # Example
//!
//! ```rust
//! use threadline_resilience::{CircuitBreaker, CircuitBreakerConfig, RateLimiter, RetryPolicy};
//! use std::time::Duration;
//!
//! // 60 requests per minute, bursts of 5
//! let limiter = RateLimiter::new(60.0, 5);
//! assert!(limiter.allow());
//!
//! // Retry with exponential backoff
//! let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(100));
//!
//! // Circuit breaker
//! let cb_config = CircuitBreakerConfig::new(5, Duration::from_secs(60));
//! let cb = CircuitBreaker::new(cb_config);
//! ```

mod circuit_breaker;
mod classify;
mod context;
mod error;
mod rate_limiter;
mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, StateChange, StateChangeCallback,
    TripPredicate,
};
pub use classify::{default_should_trip, Classify, FailureClass};
pub use context::Context;
pub use error::{CircuitOpenError, ContextError, ResilienceError, ResilienceResult};
pub use rate_limiter::{RateLimiter, Reservation, FLOOR_RATE, MAX_ADAPTED_BURST};
pub use retry::{parse_retry_after, with_retry, RetryPolicy, DEFAULT_RETRYABLE_STATUS_CODES};
