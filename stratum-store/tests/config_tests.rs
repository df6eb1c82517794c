//! Configuration surface: presets, alternative sources, fatal bootstrap
//! errors.

use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::Arc;
use stratum_store::{ALT_CONFIG_ENV, SqlEngine, StorageConfig, StorageError};
use stratum_types::DiscardSink;

#[test]
fn defaults_select_the_sqlite_engine() {
    let config = StorageConfig::default();
    assert_eq!(config.engine, "sqlite");
    assert!(config.db_path.is_none());
    assert!(!config.wipe_db_at_startup);
    assert!(config.value_size_limit > 0);
}

#[test]
fn memory_preset_profiles() {
    let config = StorageConfig::preset("test-memory").unwrap();
    assert_eq!(config.engine, "memory");
    assert!(!config.wipe_db_at_startup);

    let config = StorageConfig::preset("test-wipe").unwrap();
    assert_eq!(config.engine, "memory");
    assert!(config.wipe_db_at_startup);
}

#[test]
fn unknown_preset_is_fatal() {
    let err = StorageConfig::preset("production-magic").unwrap_err();
    assert!(matches!(err, StorageError::Config(ref msg) if msg.contains("production-magic")));
}

#[test]
fn config_loads_from_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"engine": "memory", "wipe_db_at_startup": true, "value_size_limit": 1024}}"#
    )
    .unwrap();

    let config = StorageConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.engine, "memory");
    assert!(config.wipe_db_at_startup);
    assert_eq!(config.value_size_limit, 1024);
}

#[test]
fn unreadable_config_file_is_fatal() {
    let err =
        StorageConfig::from_json_file(std::path::Path::new("/no/such/config.json")).unwrap_err();
    assert!(matches!(err, StorageError::Config(_)));
}

#[test]
fn invalid_config_file_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json at all").unwrap();
    let err = StorageConfig::from_json_file(file.path()).unwrap_err();
    assert!(matches!(err, StorageError::Config(_)));
}

#[test]
fn ignore_flag_bypasses_the_alternative_source() {
    // even with the environment pointing at a preset, the flag wins
    unsafe {
        std::env::set_var(ALT_CONFIG_ENV, "preset:test-wipe");
    }
    let config = StorageConfig {
        ignore_alternative_db_config: true,
        ..StorageConfig::memory()
    };
    let resolved = config.resolve().unwrap();
    assert_eq!(resolved.engine, "memory");
    assert!(!resolved.wipe_db_at_startup);
}

#[test]
fn alternative_preset_overrides_via_environment() {
    unsafe {
        std::env::set_var(ALT_CONFIG_ENV, "preset:test-wipe");
    }
    let resolved = StorageConfig::default().resolve().unwrap();
    assert_eq!(resolved.engine, "memory");
    assert!(resolved.wipe_db_at_startup);
}

#[test]
fn unknown_engine_name_fails_construction() {
    let config = StorageConfig {
        engine: "oracle".to_string(),
        ..StorageConfig::default()
    };
    let err = SqlEngine::open(&config, Arc::new(DiscardSink)).unwrap_err();
    assert!(matches!(err, StorageError::Config(ref msg) if msg.contains("oracle")));
}

#[test]
fn sqlite_engine_without_path_fails_construction() {
    let config = StorageConfig::default();
    let err = SqlEngine::open(&config, Arc::new(DiscardSink)).unwrap_err();
    assert!(matches!(err, StorageError::Config(ref msg) if msg.contains("db_path")));
}
