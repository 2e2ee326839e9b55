//! Configuration loading and root folder resolution
//!
//! Tests touching FURNICRAFT_ROOT_FOLDER are #[serial] so they never race
//! on the process environment.

use std::env;
use std::path::PathBuf;

use furni_common::config::{
    load_toml_config, resolve_root_folder, RootFolder, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;

#[test]
fn test_missing_config_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_toml_config(&dir.path().join("absent.toml")).unwrap();

    assert!(config.root_folder.is_none());
    assert!(config.flowise.api_url.is_none());
    assert_eq!(config.polling.max_attempts, 90);
}

#[test]
fn test_malformed_config_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server\nport = ").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn test_config_file_sections_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/furnicraft"

[server]
host = "0.0.0.0"
port = 8080

[storage]
public_base_url = "https://cdn.example/furniture-images"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.root_folder.as_deref(), Some("/srv/furnicraft"));
    assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
    assert_eq!(
        config.storage.public_base_url.as_deref(),
        Some("https://cdn.example/furniture-images")
    );
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some("/from/toml".to_string()),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some("/from/cli"), &config);
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some("/from/toml".to_string()),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, &config);
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "  ");
    let config = TomlConfig {
        root_folder: Some("/from/toml".to_string()),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, &config);
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/from/toml"));
}

#[test]
#[serial]
fn test_default_root_folder_when_unset() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = resolve_root_folder(None, &TomlConfig::default());

    assert!(!resolved.as_os_str().is_empty());
    assert!(resolved.to_string_lossy().contains("furnicraft"));
}

#[test]
fn test_ensure_directories_creates_layout() {
    let dir = tempfile::tempdir().unwrap();
    let root = RootFolder::new(dir.path().join("nested").join("root"));

    root.ensure_directories().unwrap();
    root.ensure_directories().unwrap();

    assert!(root.images_path().is_dir());
    assert_eq!(root.database_path().parent(), Some(root.path()));
}
