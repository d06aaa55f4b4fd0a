//! Tests for bootstrap configuration and root folder resolution
//!
//! Tests that touch OPTISTOCK_ROOT_FOLDER are marked #[serial] so they never
//! race on the process environment.

use optistock_common::config::{
    default_root_folder, RootFolderInitializer, RootFolderResolver, TomlConfig, DATABASE_FILE_NAME,
    ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[test]
fn test_toml_defaults_when_keys_missing() {
    let config = TomlConfig::from_toml_str("").unwrap();
    assert_eq!(config.port, 5780);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(config.logging.level, "info");
    assert!(config.root_folder.is_none());
}

#[test]
fn test_toml_values_are_read() {
    let config = TomlConfig::from_toml_str(
        r#"
        root_folder = "/srv/optistock"
        port = 6000
        bind_address = "0.0.0.0"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/optistock")));
    assert_eq!(config.port, 6000);
    assert_eq!(config.bind_address, "0.0.0.0");
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_invalid_toml_is_an_error() {
    assert!(TomlConfig::from_toml_str("port = \"not a number\"").is_err());
}

#[test]
fn test_load_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();

    // Missing file
    let config = TomlConfig::load(Some(&dir.path().join("missing.toml")));
    assert_eq!(config.port, 5780);

    // Broken file
    let broken = dir.path().join("broken.toml");
    std::fs::write(&broken, "port = [").unwrap();
    let config = TomlConfig::load(Some(&broken));
    assert_eq!(config.port, 5780);

    // Valid file
    let valid = dir.path().join("valid.toml");
    std::fs::write(&valid, "port = 7001").unwrap();
    let config = TomlConfig::load(Some(&valid));
    assert_eq!(config.port, 7001);
}

#[test]
#[serial]
fn test_cli_arg_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/optistock-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/optistock-toml")),
        ..TomlConfig::default()
    };

    let resolver = RootFolderResolver::new(Some(PathBuf::from("/tmp/optistock-cli")), &toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/optistock-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/optistock-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/optistock-toml")),
        ..TomlConfig::default()
    };

    let resolver = RootFolderResolver::new(None, &toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/optistock-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_beats_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/optistock-toml")),
        ..TomlConfig::default()
    };

    let resolver = RootFolderResolver::new(None, &toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/optistock-toml"));
}

#[test]
#[serial]
fn test_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let resolver = RootFolderResolver::new(None, &TomlConfig::default());
    let root = resolver.resolve();

    assert!(!root.as_os_str().is_empty());
    assert_eq!(root, default_root_folder());
}

#[test]
fn test_initializer_database_path() {
    let root = PathBuf::from("/tmp/optistock-test-root");
    let initializer = RootFolderInitializer::new(root.clone());
    assert_eq!(initializer.database_path(), root.join(DATABASE_FILE_NAME));
}

#[test]
fn test_initializer_creates_directory_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert!(initializer.ensure_directory_exists().is_ok());
    assert!(initializer.ensure_directory_exists().is_ok());
    assert!(root.is_dir());
    assert!(!initializer.database_exists());
}
