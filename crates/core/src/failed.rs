// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable record of conversation messages the server rejected.
//!
//! Stored as one JSON object keyed by channel, each value an ordered list of
//! `failed` messages. Every call reads storage afresh; the record is the only
//! piece of conversation state that survives a restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::message::ChannelMessage;
use crate::storage::{read_or_empty, remove_best_effort, write_best_effort, Storage};

/// Default storage key for failed messages.
pub const FAILED_MESSAGES_STORAGE_KEY: &str = "ws_failed_messages";

/// Failed messages of every channel.
pub type FailedMessagesRecord = BTreeMap<String, Vec<ChannelMessage>>;

/// Per-channel durable store of failed messages.
#[derive(Clone)]
pub struct FailedMessageStore {
    storage: Arc<dyn Storage>,
    key: String,
}

impl FailedMessageStore {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        FailedMessageStore { storage, key: key.into() }
    }

    /// Loads every channel's failed messages.
    ///
    /// Missing, unreadable or non-object data loads as empty.
    pub fn load_all(&self) -> FailedMessagesRecord {
        let Some(raw) = read_or_empty(self.storage.as_ref(), &self.key) else {
            return FailedMessagesRecord::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("discarding unreadable failed-message record: {}", e);
            FailedMessagesRecord::new()
        })
    }

    /// Failed messages of one channel, in the order they failed.
    pub fn channel(&self, channel: &str) -> Vec<ChannelMessage> {
        self.load_all().remove(channel).unwrap_or_default()
    }

    /// Replaces one channel's failed messages. An empty list removes the channel.
    pub fn set_channel(&self, channel: &str, messages: Vec<ChannelMessage>) {
        let mut all = self.load_all();
        if messages.is_empty() {
            all.remove(channel);
        } else {
            all.insert(channel.to_string(), messages);
        }
        self.save(&all);
    }

    /// Appends `message` to the channel unless a message with its id is
    /// already recorded. Returns whether it was added.
    pub fn add(&self, channel: &str, message: ChannelMessage) -> bool {
        let mut persisted = self.channel(channel);
        if persisted.iter().any(|m| m.id == message.id) {
            return false;
        }
        persisted.push(message);
        self.set_channel(channel, persisted);
        true
    }

    /// Removes one message from the channel's record.
    pub fn remove(&self, channel: &str, message_id: &str) {
        let mut persisted = self.channel(channel);
        persisted.retain(|m| m.id != message_id);
        self.set_channel(channel, persisted);
    }

    /// Removes the channel's record.
    pub fn clear_channel(&self, channel: &str) {
        let mut all = self.load_all();
        all.remove(channel);
        self.save(&all);
    }

    /// Removes every channel's record.
    pub fn clear_all(&self) {
        remove_best_effort(self.storage.as_ref(), &self.key);
    }

    fn save(&self, all: &FailedMessagesRecord) {
        match serde_json::to_string(all) {
            Ok(json) => write_best_effort(self.storage.as_ref(), &self.key, &json),
            Err(e) => tracing::warn!("failed to serialize failed-message record: {}", e),
        }
    }
}

impl std::fmt::Debug for FailedMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailedMessageStore").field("key", &self.key).finish()
    }
}

#[cfg(test)]
#[path = "failed_tests.rs"]
mod tests;
