//! Reading and writing the config file
//!
//! Writes go through a temp file in the target directory and are renamed
//! into place. The previous file is copied to `<name>.toml.backup` first.

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const DEFAULT_HEADER: &str = "\
# Threadline client configuration
#
# Every key can be overridden with THREADLINE_<SECTION>_<FIELD>,
# e.g. THREADLINE_RETRY_MAX_RETRIES=5. Set `enabled = false` in
# [rate_limit], [retry] or [circuit_breaker] to switch that layer off.

";

/// Loads and stores one config file
pub struct ConfigPersistence {
    config_path: PathBuf,
}

impl ConfigPersistence {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Reads the file, falling back to defaults only when it does not exist.
    ///
    /// A file written by a newer release is read as the current version.
    /// Values that fail validation are kept and reported as a warning.
    pub fn load(&self) -> ConfigResult<Config> {
        if !self.config_path.exists() {
            log::info!(
                "No config at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Read {
            path: self.config_path.clone(),
            source,
        })?;

        // An empty file is a truncated write, not a request for defaults
        if contents.trim().is_empty() {
            return Err(ConfigError::Read {
                path: self.config_path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, "config file is empty"),
            });
        }

        let mut config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })?;

        if config.version != CONFIG_VERSION {
            log::warn!(
                "config version {} is not {}, reading it as {}",
                config.version,
                CONFIG_VERSION,
                CONFIG_VERSION
            );
            config.version = CONFIG_VERSION;
        }

        if let Err(errors) = config.validate() {
            log::warn!("{}", ConfigError::Invalid(errors));
        }

        Ok(config)
    }

    /// Validates `config` and replaces the file with it.
    ///
    /// Nothing on disk changes when validation fails.
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        config.validate().map_err(ConfigError::Invalid)?;

        let body = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
        self.replace_file(&body)?;

        log::info!("Config saved to {}", self.config_path.display());
        Ok(())
    }

    /// Writes the defaults behind a comment block describing overrides
    pub fn generate_default_with_comments(&self) -> ConfigResult<()> {
        let body = toml::to_string_pretty(&Config::default()).map_err(ConfigError::Serialize)?;
        self.replace_file(&format!("{}{}", DEFAULT_HEADER, body))?;

        log::info!("Generated default config at {}", self.config_path.display());
        Ok(())
    }

    fn replace_file(&self, content: &str) -> ConfigResult<()> {
        let dir = self
            .config_path
            .parent()
            .ok_or_else(|| ConfigError::PathResolution {
                reason: "config path has no parent directory".to_string(),
            })?;
        create_dir(dir)?;

        if self.config_path.exists() {
            let backup_path = self.config_path.with_extension("toml.backup");
            fs::copy(&self.config_path, &backup_path).map_err(|source| ConfigError::Backup { source })?;
            log::debug!("Backed up config to {}", backup_path.display());
        }

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(content.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.config_path)
            .map_err(|e| ConfigError::Write {
                path: self.config_path.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

fn create_dir(path: &Path) -> ConfigResult<()> {
    if path.exists() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|source| ConfigError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Created config directory {}", path.display());
    Ok(())
}
