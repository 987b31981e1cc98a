//! Config module tests

use std::path::PathBuf;

use crate::config::{Config, CoverageSettings, DatabaseSettings};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(config.database.path.is_none());
    assert_eq!(config.database.max_connections, 5);
    assert_eq!(config.coverage.saturation_threshold, 4);
    assert!(config.reconcile.knowledge_base.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_get_set() {
    let mut config = Config::default();

    config.set("coverage.saturation_threshold", "6").unwrap();
    assert_eq!(config.get("coverage.saturation_threshold").unwrap(), "6");

    config.set("database.path", "/tmp/tax.db").unwrap();
    assert_eq!(config.database.path, Some(PathBuf::from("/tmp/tax.db")));
    assert_eq!(config.database_path(), PathBuf::from("/tmp/tax.db"));

    config.set("reconcile.knowledge_base", "kb.toml").unwrap();
    assert_eq!(config.get("reconcile.knowledge_base").unwrap(), "kb.toml");

    config.set("reconcile.knowledge_base", "").unwrap();
    assert!(config.reconcile.knowledge_base.is_none());
}

#[test]
fn test_config_set_rejects_invalid_values() {
    let mut config = Config::default();

    assert!(config.set("coverage.saturation_threshold", "0").is_err());
    assert!(config.set("coverage.saturation_threshold", "many").is_err());
    assert!(config.set("database.max_connections", "0").is_err());
    assert!(config.set("llm.default_model", "x").is_err());
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_list_covers_all_keys() {
    let listed = Config::default().list().unwrap();
    let keys: Vec<_> = listed.iter().map(|(k, _)| k.as_str()).collect();

    assert_eq!(
        keys,
        vec![
            "database.path",
            "database.max_connections",
            "coverage.saturation_threshold",
            "reconcile.knowledge_base",
        ]
    );
}

#[test]
fn test_config_save_and_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.set("coverage.saturation_threshold", "3").unwrap();
    config.set("database.path", "/data/tax.db").unwrap();
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_load_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(loaded, Config::default());
}

#[test]
fn test_config_partial_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[coverage]\nsaturation_threshold = 2\n").unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.coverage.saturation_threshold, 2);
    assert_eq!(loaded.database, DatabaseSettings::default());
}

#[test]
fn test_config_load_rejects_zero_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[coverage]\nsaturation_threshold = 0\n").unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_ne!(CoverageSettings::default().saturation_threshold, 0);
}

#[test]
fn test_database_config_uses_settings() {
    let mut config = Config::default();
    config.set("database.path", "/data/tax.db").unwrap();
    config.set("database.max_connections", "2").unwrap();

    let db = config.database_config();
    assert_eq!(db.path, PathBuf::from("/data/tax.db"));
    assert_eq!(db.max_connections, 2);
}
