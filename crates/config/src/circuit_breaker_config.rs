//! Circuit breaker configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Breaker thresholds and probing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Disabled means the breaker never refuses a call
    pub enabled: bool,

    /// Consecutive trip-worthy failures that open the breaker
    pub failure_threshold: u32,

    /// Half-open successes needed to close again
    pub success_threshold: u32,

    /// Time spent open before probing, in milliseconds
    pub open_timeout_ms: u64,

    /// Concurrent probes while half-open (0 behaves as 1)
    pub max_half_open_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout_ms: 60_000,
            max_half_open_requests: 1,
        }
    }
}

impl ConfigSection for CircuitBreakerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(
                self.failure_threshold,
                1,
                1000,
                "circuit_breaker.failure_threshold",
            ),
            Validator::in_range(
                self.success_threshold,
                1,
                100,
                "circuit_breaker.success_threshold",
            ),
            Validator::in_range(
                self.open_timeout_ms,
                1,
                3_600_000,
                "circuit_breaker.open_timeout_ms",
            ),
            Validator::in_range(
                self.max_half_open_requests,
                0,
                100,
                "circuit_breaker.max_half_open_requests",
            ),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.enabled = other.enabled;
        self.failure_threshold = other.failure_threshold;
        self.success_threshold = other.success_threshold;
        self.open_timeout_ms = other.open_timeout_ms;
        self.max_half_open_requests = other.max_half_open_requests;
    }

    fn section_name(&self) -> &'static str {
        "circuit_breaker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CircuitBreakerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_failure_threshold_rejected() {
        let config = CircuitBreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
