//! Loading pool configuration from disk.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use burrow_core::config::PoolConfig;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
max_pool = 4
acquire_timeout_ms = 1500

[logging]
level = "burrow_pool=debug"
with_target = false
"#
    )
    .unwrap();

    let config = PoolConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.max_pool, 4);
    assert_eq!(
        config.acquire_timeout_duration(),
        Some(Duration::from_millis(1500))
    );
    assert_eq!(config.logging.level, "burrow_pool=debug");
    assert!(!config.logging.with_target);
    assert!(config.logging.enabled);
}

#[test]
fn test_missing_file_yields_defaults() {
    let config = PoolConfig::load(Some(Path::new("/nonexistent/burrow.toml"))).unwrap();
    assert_eq!(config, PoolConfig::default());
}

#[test]
fn test_no_path_yields_defaults() {
    let config = PoolConfig::load(None).unwrap();
    assert_eq!(config.max_pool, 10);
}

#[test]
fn test_invalid_capacity_in_file_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "max_pool = 0").unwrap();

    let err = PoolConfig::load(Some(file.path())).unwrap_err();
    assert!(
        err.to_string().contains("max_pool cannot be zero"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_malformed_file_reports_path() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "max_pool = [").unwrap();

    let err = PoolConfig::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("Failed to parse configuration file"));
}
