//! Retry configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Backoff and retry eligibility
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Disabled means every call makes exactly one attempt
    pub enabled: bool,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    pub base_delay_ms: u64,

    /// Cap on any single backoff in milliseconds
    pub max_delay_ms: u64,

    /// Symmetric jitter factor (0.0 - 0.99)
    pub jitter_factor: f64,

    /// HTTP statuses worth another attempt
    pub retryable_status_codes: Vec<u16>,

    /// Use the server's Retry-After hint when present
    pub respect_retry_after: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter_factor: 0.1,
            retryable_status_codes: vec![429, 502, 503],
            respect_retry_after: true,
        }
    }
}

impl ConfigSection for RetryConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::in_range(self.max_retries, 0, 20, "retry.max_retries"),
            Validator::in_range(self.base_delay_ms, 1, 60_000, "retry.base_delay_ms"),
            Validator::in_range(self.max_delay_ms, 1, 600_000, "retry.max_delay_ms"),
            Validator::in_range(self.jitter_factor, 0.0, 0.99, "retry.jitter_factor"),
        ];

        if self.max_delay_ms < self.base_delay_ms {
            results.push(Err(ValidationError::with_value(
                "retry.max_delay_ms",
                "must not be smaller than retry.base_delay_ms",
                self.max_delay_ms,
            )));
        }

        for code in &self.retryable_status_codes {
            results.push(Validator::in_range(
                *code,
                100,
                599,
                "retry.retryable_status_codes",
            ));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.enabled = other.enabled;
        self.max_retries = other.max_retries;
        self.base_delay_ms = other.base_delay_ms;
        self.max_delay_ms = other.max_delay_ms;
        self.jitter_factor = other.jitter_factor;
        self.retryable_status_codes = other.retryable_status_codes;
        self.respect_retry_after = other.respect_retry_after;
    }

    fn section_name(&self) -> &'static str {
        "retry"
    }
}
