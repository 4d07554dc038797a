// crates/resilience/src/retry.rs
//! Retry policies with exponential backoff

use crate::classify::{Classify, FailureClass};
use crate::context::Context;
use crate::error::ContextError;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

/// Status codes retried by default: throttling and gateway trouble, not bare 500
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 3] = [429, 502, 503];

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    /// Symmetric jitter, in `[0, 1)`
    jitter_factor: f64,
    retryable_status_codes: BTreeSet<u16>,
    respect_retry_after: bool,
}

impl RetryPolicy {
    /// Creates a new retry policy
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.1,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
            respect_retry_after: true,
        }
    }

    /// Sets the delay before the first retry
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the jitter factor, clamped into `[0, 1)`
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = if jitter_factor.is_finite() {
            jitter_factor.clamp(0.0, 0.999)
        } else {
            0.0
        };
        self
    }

    /// Replaces the set of retryable status codes
    pub fn with_retryable_status_codes<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    /// Sets whether a server `Retry-After` hint overrides the backoff
    pub fn with_respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    pub fn retryable_status_codes(&self) -> &BTreeSet<u16> {
        &self.retryable_status_codes
    }

    pub fn respect_retry_after(&self) -> bool {
        self.respect_retry_after
    }

    /// Checks if a failure of this kind is worth retrying at all
    pub fn is_retryable(&self, class: &FailureClass) -> bool {
        match class {
            FailureClass::Transport => true,
            FailureClass::Status(code) => self.retryable_status_codes.contains(code),
            FailureClass::DeadlineExceeded
            | FailureClass::Canceled
            | FailureClass::Rejected
            | FailureClass::Local => false,
        }
    }

    /// Checks if a failure on attempt `attempt` (0-based) deserves another try
    pub fn should_retry(&self, class: &FailureClass, attempt: u32) -> bool {
        attempt < self.max_retries && self.is_retryable(class)
    }

    /// Exponential backoff for `attempt`, capped at the maximum, without jitter
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Delay to wait after attempt `attempt` failed.
    ///
    /// A positive server hint wins verbatim when the policy respects it.
    /// Otherwise the exponential backoff is perturbed by up to
    /// `±jitter_factor / 2`.
    pub fn next_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if self.respect_retry_after {
            if let Some(hint) = retry_after.filter(|hint| !hint.is_zero()) {
                return hint;
            }
        }

        let delay = self.delay_for_attempt(attempt);
        if self.jitter_factor == 0.0 {
            return delay;
        }

        let noise: f64 = rand::thread_rng().gen::<f64>() - 0.5;
        let secs = delay.as_secs_f64();
        Duration::from_secs_f64((secs + secs * self.jitter_factor * noise).max(0.0))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Parses a `Retry-After` value: delta seconds or an HTTP-date.
///
/// Dates in the past yield a zero delay. Anything unparseable yields `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Executes an async operation with retry logic.
///
/// `operation` receives the 0-based attempt index. Backoff sleeps race the
/// context; when it fires the context error is returned instead of the last
/// failure. Otherwise the caller sees the last attempt's error.
pub async fn with_retry<F, Fut, T, E>(
    ctx: &Context,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + From<ContextError>,
{
    let mut attempt = 0;
    loop {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let class = err.failure_class();
        if !policy.should_retry(&class, attempt) {
            if attempt > 0 {
                log::warn!(
                    "giving up after {} attempts, last failure {:?}",
                    attempt + 1,
                    class
                );
            }
            return Err(err);
        }

        let delay = policy.next_delay(attempt, err.retry_after());
        log::debug!(
            "attempt {} failed ({:?}), retrying in {:?}",
            attempt + 1,
            class,
            delay
        );
        ctx.sleep(delay).await?;
        attempt += 1;
    }
}
