// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[test]
fn defaults() {
    let config = ManagerConfig::default();
    assert_eq!(config.url, "ws://localhost:3001/ws");
    assert_eq!(config.ping_interval_ms, 30_000);
    assert_eq!(config.pong_timeout_ms, 10_000);
    assert_eq!(config.reconnect_max_attempts, 5);
    assert_eq!(config.reconnect_base_delay_ms, 1_000);
    assert_eq!(config.reconnect_max_delay_ms, 5_000);
    assert_eq!(config.queue_max_age_ms, 86_400_000);
    assert_eq!(config.queue_storage_key, "ws_outgoing_queue");
    assert_eq!(config.failed_storage_key, "ws_failed_messages");
}

#[test]
fn partial_json_uses_defaults() {
    let config: ManagerConfig =
        serde_json::from_str(r#"{"url": "wss://chat.example.com/ws", "ping_interval_ms": 500}"#)
            .unwrap();
    assert_eq!(config.url, "wss://chat.example.com/ws");
    assert_eq!(config.ping_interval_ms, 500);
    assert_eq!(config.pong_timeout_ms, 10_000);
    assert!(config.token.is_empty());
}

#[test]
fn token_protocols() {
    assert!(ManagerConfig::default().token_protocols().is_empty());
    let config = ManagerConfig::default().with_token("abc123");
    assert_eq!(config.token_protocols(), vec!["access_token".to_string(), "abc123".to_string()]);
}

#[parameterized(
    ws = { "ws://localhost:3001/ws" },
    wss = { "wss://example.com/socket" },
)]
fn valid_urls(url: &str) {
    assert!(ManagerConfig::new(url).validate().is_ok());
}

#[parameterized(
    http = { "http://localhost:3001" },
    empty = { "" },
    bare = { "localhost:3001" },
)]
fn invalid_urls(url: &str) {
    assert!(matches!(ManagerConfig::new(url).validate(), Err(Error::Config(_))));
}

#[test]
fn rejects_zero_pong_timeout_with_heartbeat() {
    let config = ManagerConfig { pong_timeout_ms: 0, ..Default::default() };
    assert!(config.validate().is_err());

    let disabled = ManagerConfig { ping_interval_ms: 0, pong_timeout_ms: 0, ..Default::default() };
    assert!(disabled.validate().is_ok());
}

#[test]
fn rejects_inverted_backoff_bounds() {
    let config = ManagerConfig {
        reconnect_base_delay_ms: 10_000,
        reconnect_max_delay_ms: 5_000,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}
