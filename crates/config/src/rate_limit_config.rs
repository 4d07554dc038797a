//! Client-side rate limit section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Token bucket settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Disabled means calls are never throttled locally
    pub enabled: bool,

    /// Sustained request rate
    pub requests_per_minute: f64,

    /// Requests allowed back to back
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 60.0,
            burst: 5,
        }
    }
}

impl ConfigSection for RateLimitConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(
                self.requests_per_minute,
                0.1,
                100_000.0,
                "rate_limit.requests_per_minute",
            ),
            Validator::in_range(self.burst, 1, 1000, "rate_limit.burst"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.enabled = other.enabled;
        self.requests_per_minute = other.requests_per_minute;
        self.burst = other.burst;
    }

    fn section_name(&self) -> &'static str {
        "rate_limit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RateLimitConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_burst_rejected() {
        let config = RateLimitConfig {
            burst: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge() {
        let mut base = RateLimitConfig::default();
        base.merge(RateLimitConfig {
            enabled: false,
            requests_per_minute: 30.0,
            burst: 2,
        });
        assert!(!base.enabled);
        assert_eq!(base.burst, 2);
    }
}
