// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_partial_connection_table() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        "[connection]\nurl = \"wss://chat.example.test/ws\"\nping_interval_ms = 0\n",
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.connection.url, "wss://chat.example.test/ws");
    assert_eq!(config.connection.ping_interval_ms, 0);
    assert_eq!(config.connection.reconnect_max_attempts, 5);
    assert_eq!(config.connection.pong_timeout_ms, 10_000);
}

#[test]
fn test_load_empty_file_gives_defaults() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "");
    assert_eq!(Config::load(&path).unwrap(), Config::default());
}

#[test]
fn test_load_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = Config::load(&temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound(_)));
}

#[test]
fn test_load_invalid_toml() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "[connection\nurl = 3");
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().starts_with("invalid config file"));
}

#[test]
fn test_overrides_replace_only_given_values() {
    let mut config = Config::default();
    config.apply_overrides(None, Some("secret".to_string()));
    assert_eq!(config.connection.url, "ws://localhost:3001/ws");
    assert_eq!(config.connection.token, "secret");

    config.apply_overrides(Some("ws://other.test/ws".to_string()), None);
    assert_eq!(config.connection.url, "ws://other.test/ws");
    assert_eq!(config.connection.token, "secret");
}

#[test]
fn test_resolve_flags_win_and_are_validated() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "[connection]\nurl = \"ws://file.test/ws\"\n");
    let args = GlobalArgs {
        config: Some(path.clone()),
        url: Some("wss://flag.test/ws".to_string()),
        ..Default::default()
    };
    assert_eq!(Config::resolve(&args).unwrap().connection.url, "wss://flag.test/ws");

    let args = GlobalArgs { config: Some(path), url: Some("http://nope".to_string()), ..Default::default() };
    assert!(matches!(Config::resolve(&args), Err(Error::Client(_))));
}

#[test]
fn test_rendered_toml_hides_token() {
    let mut config = Config::default();
    config.connection.token = "secret".to_string();
    let rendered = config.to_toml_redacted().unwrap();
    assert!(rendered.contains("[connection]"));
    assert!(rendered.contains(REDACTED));
    assert!(!rendered.contains("secret"));

    let reparsed: Config = toml::from_str(&rendered).unwrap();
    assert_eq!(reparsed.connection.url, config.connection.url);
}

#[test]
fn test_state_dir_explicit_wins() {
    let dir = state_dir(Some(Path::new("/tmp/explicit")));
    assert_eq!(dir, PathBuf::from("/tmp/explicit"));
}
