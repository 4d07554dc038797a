//! Threadline Configuration System
//!
//! Settings for the API client, its rate limiter, retry policy and circuit
//! breaker, stored as one TOML file with a section per concern.
//!
//! # Architecture
//!
//! - **Trait-based**: Each section implements `ConfigSection`
//! - **Graceful degradation**: Invalid configs fall back to defaults with warnings
//! - **Atomic writes**: Config files are never left in a corrupted state
//! - **Environment overrides**: `THREADLINE_<SECTION>_<FIELD>` beats the file
//!
//! # Example
//!
//! ```rust
//! use threadline_config::{Config, ConfigManager};
//!
//! // Load config (creates default if missing)
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Requests per minute: {}", config.rate_limit.requests_per_minute);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
mod circuit_breaker_config;
mod client_config;
mod rate_limit_config;
mod retry_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::{ConfigManager, ENV_PREFIX};
pub use validation::{ConfigSection, Validator};

// Re-export config sections
pub use circuit_breaker_config::CircuitBreakerConfig;
pub use client_config::ClientConfig;
pub use rate_limit_config::RateLimitConfig;
pub use retry_config::RetryConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
///
/// This contains all config sections. Missing sections take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Connection settings
    pub client: ClientConfig,

    /// Local request throttling
    pub rate_limit: RateLimitConfig,

    /// Backoff and retry
    pub retry: RetryConfig,

    /// Fail-fast protection
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.client.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.rate_limit.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.retry.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.circuit_breaker.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    ///
    /// This is used for override chains: defaults < file < env vars
    pub fn merge(&mut self, other: Config) {
        self.client.merge(other.client);
        self.rate_limit.merge(other.rate_limit);
        self.retry.merge(other.retry);
        self.circuit_breaker.merge(other.circuit_breaker);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            client: ClientConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_version_is_set() {
        let config = Config::default();
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut override_config = Config::default();
        override_config.retry.max_retries = 7;

        base.merge(override_config);
        assert_eq!(base.retry.max_retries, 7);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [retry]
            max_retries = 1

            [circuit_breaker]
            enabled = false
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert!(!config.circuit_breaker.enabled);
        assert_eq!(config.rate_limit, RateLimitConfig::default());
    }

    #[test]
    fn test_errors_collected_across_sections() {
        let mut config = Config::default();
        config.rate_limit.burst = 0;
        config.circuit_breaker.failure_threshold = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
