//! Integration tests for the configuration system

use tempfile::TempDir;
use threadline_config::{
    CircuitBreakerConfig, ClientConfig, Config, ConfigManager, ConfigSection, RateLimitConfig,
    RetryConfig, CONFIG_VERSION,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    init_logging();
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_full_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let created = manager.initialize()?;
    assert!(created);

    let config = manager.load()?;
    assert_eq!(config.version, CONFIG_VERSION);

    let mut modified = config.clone();
    modified.retry.max_retries = 2;
    modified.circuit_breaker.enabled = false;
    manager.save(&modified)?;

    let reloaded = manager.load()?;
    assert_eq!(reloaded.retry.max_retries, 2);
    assert!(!reloaded.circuit_breaker.enabled);

    manager.reset()?;
    let after_reset = manager.load()?;
    assert_eq!(after_reset, Config::default());

    Ok(())
}

#[test]
fn test_config_validation_integration() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    manager.save(&Config::default())?;

    let errors = manager.validate()?;
    assert!(errors.is_empty());

    let mut invalid = Config::default();
    invalid.client.base_url = "not a url".to_string();
    let result = manager.save(&invalid);
    assert!(result.is_err());

    Ok(())
}

#[test]
fn test_atomic_save() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let config = Config::default();
    manager.save(&config)?;

    assert!(manager.config_path().exists());

    manager.save(&config)?;

    let backup_path = manager.config_path().with_extension("toml.backup");
    assert!(backup_path.exists());

    Ok(())
}

#[test]
fn test_merge_functionality() {
    let mut base = Config::default();
    let mut override_config = Config::default();

    override_config.rate_limit.burst = 1;
    override_config.retry.respect_retry_after = false;
    override_config.client.base_url = "https://oauth.reddit.com".to_string();

    base.merge(override_config);

    assert_eq!(base.rate_limit.burst, 1);
    assert!(!base.retry.respect_retry_after);
    assert_eq!(base.client.base_url, "https://oauth.reddit.com");
}

#[test]
fn test_all_sections_default_are_valid() {
    assert!(ClientConfig::default().validate().is_ok());
    assert!(RateLimitConfig::default().validate().is_ok());
    assert!(RetryConfig::default().validate().is_ok());
    assert!(CircuitBreakerConfig::default().validate().is_ok());
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_section_names() {
    assert_eq!(ClientConfig::default().section_name(), "client");
    assert_eq!(RateLimitConfig::default().section_name(), "rate_limit");
    assert_eq!(RetryConfig::default().section_name(), "retry");
    assert_eq!(
        CircuitBreakerConfig::default().section_name(),
        "circuit_breaker"
    );
}

#[test]
fn test_update_closure() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    manager.initialize()?;

    manager.update(|config| {
        config.rate_limit.requests_per_minute = 30.0;
        config.retry.retryable_status_codes = vec![429];
    })?;

    let config = manager.load()?;
    assert_eq!(config.rate_limit.requests_per_minute, 30.0);
    assert_eq!(config.retry.retryable_status_codes, vec![429]);

    Ok(())
}

#[test]
fn test_serialization_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let original = Config::default();
    let toml_string = toml::to_string(&original)?;
    let deserialized: Config = toml::from_str(&toml_string)?;
    assert_eq!(original, deserialized);
    Ok(())
}

#[test]
fn test_env_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    std::env::set_var("THREADLINE_RATE_LIMIT_BURST", "3");
    std::env::set_var("THREADLINE_RETRY_ENABLED", "false");

    let config = manager.load_with_env_overrides()?;

    assert_eq!(config.rate_limit.burst, 3);
    assert!(!config.retry.enabled);

    std::env::remove_var("THREADLINE_RATE_LIMIT_BURST");
    std::env::remove_var("THREADLINE_RETRY_ENABLED");

    Ok(())
}

#[test]
fn test_multiple_validation_errors_collected() {
    let mut config = Config::default();
    config.client.timeout_secs = 0;
    config.retry.jitter_factor = 2.0;
    config.circuit_breaker.success_threshold = 0;

    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 3);
}
