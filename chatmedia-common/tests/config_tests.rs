//! Configuration loading and source priority
//!
//! Tests that touch CHATMEDIA_CONFIG or CHATMEDIA_BACKEND_ORIGIN are marked
//! #[serial] so they do not race on the process environment.

use chatmedia_common::config::{
    load_config, resolve_config_path, TomlConfig, CONFIG_ENV_VAR, ORIGIN_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"
backend_origin = "https://chat.example.com"
provider_origin = "https://cdn.example.com"
max_local_retries = 5
channel_capacity = 8

[logging]
level = "debug"
"#,
    );

    let config = TomlConfig::load(file.path()).expect("config should load");
    assert_eq!(config.backend_origin, "https://chat.example.com");
    assert_eq!(config.provider_origin.as_deref(), Some("https://cdn.example.com"));
    assert_eq!(config.max_local_retries, 5);
    assert_eq!(config.channel_capacity, 8);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_malformed_file_is_error() {
    let file = write_config("backend_origin = [not toml");
    assert!(TomlConfig::load(file.path()).is_err());
}

#[test]
#[serial]
fn test_cli_path_wins_over_env() {
    let cli = PathBuf::from("/tmp/cli-config.toml");
    env::set_var(CONFIG_ENV_VAR, "/tmp/env-config.toml");

    let resolved = resolve_config_path(Some(&cli));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(cli));
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/env-config.toml");
    let resolved = resolve_config_path(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/tmp/env-config.toml")));
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(ORIGIN_ENV_VAR);
    let missing = PathBuf::from("/nonexistent/chatmedia/config.toml");

    let config = load_config(Some(&missing), None).expect("missing file is not fatal");
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_origin_priority() {
    let file = write_config("backend_origin = \"https://file.example.com\"\n");

    env::remove_var(ORIGIN_ENV_VAR);
    let from_file = load_config(Some(file.path()), None).expect("load");
    assert_eq!(from_file.backend_origin, "https://file.example.com");

    env::set_var(ORIGIN_ENV_VAR, "https://env.example.com");
    let from_env = load_config(Some(file.path()), None).expect("load");
    let from_cli = load_config(Some(file.path()), Some("https://cli.example.com")).expect("load");
    env::remove_var(ORIGIN_ENV_VAR);

    assert_eq!(from_env.backend_origin, "https://env.example.com");
    assert_eq!(from_cli.backend_origin, "https://cli.example.com");
}

#[test]
#[serial]
fn test_invalid_cli_origin_rejected() {
    env::remove_var(ORIGIN_ENV_VAR);
    let missing = PathBuf::from("/nonexistent/chatmedia/config.toml");
    assert!(load_config(Some(&missing), Some("not a url")).is_err());
}
