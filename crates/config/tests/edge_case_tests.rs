//! Edge case and error scenario tests

use std::fs;
use tempfile::TempDir;
use threadline_config::{Config, ConfigManager};

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
fn test_corrupted_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    fs::write(manager.config_path(), "this is not valid TOML {{{")?;

    let config = manager.load_or_default();
    assert_eq!(config, Config::default());

    Ok(())
}

#[test]
fn test_save_creates_parent_directories() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let nested_path = temp_dir.path().join("a").join("b").join("c");
    let manager = ConfigManager::with_directory(nested_path)?;

    manager.save(&Config::default())?;
    assert!(manager.config_path().exists());

    Ok(())
}

#[test]
fn test_concurrent_config_loads() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let config_dir = temp_dir.path().to_path_buf();
    let manager = ConfigManager::with_directory(config_dir.clone())?;
    manager.initialize()?;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let dir = config_dir.clone();
            std::thread::spawn(move || {
                if let Ok(mgr) = ConfigManager::with_directory(dir) {
                    for _ in 0..10 {
                        let _ = mgr.load();
                        std::thread::sleep(std::time::Duration::from_millis(1));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().is_ok());
    }

    Ok(())
}

#[test]
fn test_boundary_values_validation() {
    let mut config = Config::default();

    config.rate_limit.burst = 1;
    config.retry.max_retries = 0;
    config.retry.jitter_factor = 0.0;
    assert!(config.validate().is_ok());

    config.retry.jitter_factor = 0.99;
    config.circuit_breaker.max_half_open_requests = 0;
    assert!(config.validate().is_ok());

    config.retry.max_retries = 21;
    assert!(config.validate().is_err());
}

#[test]
#[cfg(unix)]
fn test_readonly_config_dir() -> Result<(), Box<dyn std::error::Error>> {
    use std::os::unix::fs::PermissionsExt;

    let (temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    let mut perms = fs::metadata(temp_dir.path())?.permissions();
    perms.set_mode(0o555);
    fs::set_permissions(temp_dir.path(), perms.clone())?;

    // Root ignores permission bits
    let result = manager.save(&Config::default());
    let loaded = manager.load();

    perms.set_mode(0o755);
    fs::set_permissions(temp_dir.path(), perms)?;

    if result.is_err() {
        assert!(loaded.is_ok());
    }

    Ok(())
}

#[test]
fn test_rapid_saves() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    for i in 0..20 {
        let mut config = Config::default();
        config.rate_limit.burst = i + 1;
        manager.save(&config)?;
    }

    assert_eq!(manager.load()?.rate_limit.burst, 20);
    Ok(())
}

#[test]
fn test_merge_with_defaults() {
    let mut base = Config::default();
    base.retry.max_retries = 9;

    base.merge(Config::default());
    assert_eq!(base.retry.max_retries, 3);
}

#[test]
fn test_config_file_deleted_during_operation() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    fs::remove_file(manager.config_path())?;

    let config = manager.load_or_default();
    assert_eq!(config, Config::default());

    Ok(())
}

#[test]
fn test_empty_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "")?;

    assert!(manager.load().is_err());
    assert_eq!(manager.load_or_default(), Config::default());

    Ok(())
}

#[test]
fn test_partial_config_toml() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let partial_toml = r#"
version = 1

[rate_limit]
requests_per_minute = 600.0
"#;
    fs::write(manager.config_path(), partial_toml)?;

    let config = manager.load()?;
    assert_eq!(config.rate_limit.requests_per_minute, 600.0);
    assert_eq!(config.rate_limit.burst, 5);
    assert_eq!(config.retry, Config::default().retry);

    Ok(())
}

#[test]
fn test_invalid_values_load_with_warning() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    fs::write(manager.config_path(), "[retry]\nmax_retries = 500\n")?;

    let config = manager.load()?;
    assert_eq!(config.retry.max_retries, 500);
    assert!(!manager.validate()?.is_empty());

    Ok(())
}

#[test]
fn test_update_with_invalid_value() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    let result = manager.update(|config| {
        config.circuit_breaker.failure_threshold = 0;
    });
    assert!(result.is_err());

    let config = manager.load()?;
    assert_eq!(config.circuit_breaker.failure_threshold, 5);

    Ok(())
}

#[test]
fn test_backup_preserved_on_failed_save() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let mut config = Config::default();
    config.retry.max_retries = 4;
    manager.save(&config)?;
    manager.save(&config)?;

    config.retry.max_retries = 200;
    assert!(manager.save(&config).is_err());

    let backup_path = manager.config_path().with_extension("toml.backup");
    let backup_config: Config = toml::from_str(&fs::read_to_string(&backup_path)?)?;
    assert_eq!(backup_config.retry.max_retries, 4);

    Ok(())
}

#[test]
fn test_future_version_is_normalized() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "version = 99\n")?;

    let config = manager.load()?;
    assert_eq!(config.version, threadline_config::CONFIG_VERSION);

    Ok(())
}
