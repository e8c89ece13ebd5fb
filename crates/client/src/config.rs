// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection manager configuration.

use serde::{Deserialize, Serialize};
use sl_core::{FAILED_MESSAGES_STORAGE_KEY, QUEUE_MAX_AGE_MS, QUEUE_STORAGE_KEY};

use crate::error::{Error, Result};

/// Sub-protocol carrying the access token during the handshake.
pub const TOKEN_PROTOCOL: &str = "access_token";

/// Settings for one [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Server endpoint, `ws://` or `wss://`.
    #[serde(default = "default_url")]
    pub url: String,
    /// Access token offered as a sub-protocol. Empty means none.
    #[serde(default)]
    pub token: String,
    /// Heartbeat ping interval in milliseconds (default: 30000). 0 = disabled.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// Max time to wait for a pong in milliseconds (default: 10000).
    #[serde(default = "default_pong_timeout_ms")]
    pub pong_timeout_ms: u64,
    /// Reconnection attempts before giving up (default: 5).
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,
    /// Backoff base delay in milliseconds (default: 1000).
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Backoff ceiling in milliseconds (default: 5000).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Upper bound of the random jitter added to each delay (default: 1000).
    #[serde(default = "default_reconnect_jitter_ms")]
    pub reconnect_jitter_ms: u64,
    /// Queued messages older than this are dropped on startup (default: 24h).
    #[serde(default = "default_queue_max_age_ms")]
    pub queue_max_age_ms: u64,
    #[serde(default = "default_queue_storage_key")]
    pub queue_storage_key: String,
    #[serde(default = "default_failed_storage_key")]
    pub failed_storage_key: String,
}

fn default_url() -> String {
    "ws://localhost:3001/ws".to_string()
}

fn default_ping_interval_ms() -> u64 {
    30_000
}

fn default_pong_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_max_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    5_000
}

fn default_reconnect_jitter_ms() -> u64 {
    1_000
}

fn default_queue_max_age_ms() -> u64 {
    QUEUE_MAX_AGE_MS
}

fn default_queue_storage_key() -> String {
    QUEUE_STORAGE_KEY.to_string()
}

fn default_failed_storage_key() -> String {
    FAILED_MESSAGES_STORAGE_KEY.to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            url: default_url(),
            token: String::new(),
            ping_interval_ms: default_ping_interval_ms(),
            pong_timeout_ms: default_pong_timeout_ms(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_jitter_ms: default_reconnect_jitter_ms(),
            queue_max_age_ms: default_queue_max_age_ms(),
            queue_storage_key: default_queue_storage_key(),
            failed_storage_key: default_failed_storage_key(),
        }
    }
}

impl ManagerConfig {
    /// Config for `url` with every other setting at its default.
    pub fn new(url: impl Into<String>) -> Self {
        ManagerConfig { url: url.into(), ..Default::default() }
    }

    /// Sets the access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Handshake sub-protocols: `["access_token", token]`, or none without a token.
    pub fn token_protocols(&self) -> Vec<String> {
        if self.token.is_empty() {
            Vec::new()
        } else {
            vec![TOKEN_PROTOCOL.to_string(), self.token.clone()]
        }
    }

    /// Rejects settings the manager cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "invalid url '{}': must start with ws:// or wss://",
                self.url
            )));
        }
        if self.ping_interval_ms > 0 && self.pong_timeout_ms == 0 {
            return Err(Error::Config("pong_timeout_ms must be positive".to_string()));
        }
        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            return Err(Error::Config(
                "reconnect_base_delay_ms exceeds reconnect_max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
