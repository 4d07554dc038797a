//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "THREADLINE";

/// Main configuration manager
///
/// This is the primary interface for loading, saving, and managing configuration.
/// It handles file paths, defaults, and validation.
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager using the default config directory
    ///
    /// The default directory follows XDG base directory specification:
    /// - Linux: `~/.config/threadline/`
    /// - macOS: `~/Library/Application Support/threadline/`
    /// - Windows: `%APPDATA%\threadline\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let config_path = config_dir.join("config.toml");
        let persistence = ConfigPersistence::new(config_path);

        Ok(Self {
            persistence,
            config_dir,
        })
    }

    /// Returns the default config directory based on the platform
    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "threadline")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::PathResolution {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    /// Returns the config directory path
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Returns the full config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Loads the configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file is corrupted, returns an error.
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    ///
    /// This is a convenience method that never returns an error.
    /// Errors are logged but the function always returns a valid config.
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Saves the configuration to file
    ///
    /// This performs validation before saving and uses atomic writes
    /// to prevent corruption.
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Updates the configuration using a closure
    ///
    /// This loads the current config, applies the update function,
    /// and saves the result atomically.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use threadline_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.retry.max_retries = 5;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Generates a default config file if one doesn't exist
    ///
    /// Returns Ok(true) if a new file was created, Ok(false) if one already exists.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.persistence.generate_default_with_comments()?;
        Ok(true)
    }

    /// Resets the configuration to defaults
    ///
    /// This overwrites the existing config file with default values.
    pub fn reset(&self) -> ConfigResult<()> {
        let default_config = Config::default();
        self.save(&default_config)
    }

    /// Validates the current configuration file
    ///
    /// Returns all validation errors found, or Ok if valid.
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Merges environment variable overrides into the config
    ///
    /// Environment variables follow the pattern: THREADLINE_SECTION_FIELD
    /// Example: THREADLINE_RETRY_MAX_RETRIES=5
    ///
    /// Unparseable values are ignored with a warning.
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        Self::apply_overrides(&mut config, |key| std::env::var(key).ok());

        // Validate after applying overrides
        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }

    /// Applies overrides resolved by `lookup`, keyed by full variable name
    pub fn apply_overrides<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let client = &mut config.client;
        override_field(&lookup, "CLIENT_BASE_URL", &mut client.base_url);
        override_field(&lookup, "CLIENT_TIMEOUT_SECS", &mut client.timeout_secs);
        override_field(&lookup, "CLIENT_USER_AGENT", &mut client.user_agent);
        override_field(&lookup, "CLIENT_MAX_REDIRECTS", &mut client.max_redirects);

        let rate_limit = &mut config.rate_limit;
        override_field(&lookup, "RATE_LIMIT_ENABLED", &mut rate_limit.enabled);
        override_field(
            &lookup,
            "RATE_LIMIT_REQUESTS_PER_MINUTE",
            &mut rate_limit.requests_per_minute,
        );
        override_field(&lookup, "RATE_LIMIT_BURST", &mut rate_limit.burst);

        let retry = &mut config.retry;
        override_field(&lookup, "RETRY_ENABLED", &mut retry.enabled);
        override_field(&lookup, "RETRY_MAX_RETRIES", &mut retry.max_retries);
        override_field(&lookup, "RETRY_BASE_DELAY_MS", &mut retry.base_delay_ms);
        override_field(&lookup, "RETRY_MAX_DELAY_MS", &mut retry.max_delay_ms);
        override_field(&lookup, "RETRY_JITTER_FACTOR", &mut retry.jitter_factor);
        override_field(
            &lookup,
            "RETRY_RESPECT_RETRY_AFTER",
            &mut retry.respect_retry_after,
        );
        let codes_key = format!("{}_RETRY_RETRYABLE_STATUS_CODES", ENV_PREFIX);
        if let Some(raw) = lookup(&codes_key) {
            let parsed: Result<Vec<u16>, _> = raw
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(u16::from_str)
                .collect();
            match parsed {
                Ok(codes) => retry.retryable_status_codes = codes,
                Err(_) => log::warn!("Ignoring unparseable {}={}", codes_key, raw),
            }
        }

        let breaker = &mut config.circuit_breaker;
        override_field(&lookup, "CIRCUIT_BREAKER_ENABLED", &mut breaker.enabled);
        override_field(
            &lookup,
            "CIRCUIT_BREAKER_FAILURE_THRESHOLD",
            &mut breaker.failure_threshold,
        );
        override_field(
            &lookup,
            "CIRCUIT_BREAKER_SUCCESS_THRESHOLD",
            &mut breaker.success_threshold,
        );
        override_field(
            &lookup,
            "CIRCUIT_BREAKER_OPEN_TIMEOUT_MS",
            &mut breaker.open_timeout_ms,
        );
        override_field(
            &lookup,
            "CIRCUIT_BREAKER_MAX_HALF_OPEN_REQUESTS",
            &mut breaker.max_half_open_requests,
        );
    }
}

fn override_field<F, T>(lookup: &F, suffix: &str, field: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let key = format!("{}_{}", ENV_PREFIX, suffix);
    let Some(raw) = lookup(&key) else {
        return;
    };

    match raw.trim().parse::<T>() {
        Ok(value) => {
            log::info!("Config override from {}", key);
            *field = value;
        }
        Err(_) => log::warn!("Ignoring unparseable {}={}", key, raw),
    }
}
