// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound queue for messages that could not be written to the socket.
//!
//! The queue lives in memory and is mirrored to durable [`Storage`] as a JSON
//! array after every mutation. On reconnect the queue is drained head-first
//! and draining stops at the first failed write, so queued messages are never
//! reordered relative to each other.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::ClockSource;
use crate::protocol::ClientMessage;
use crate::storage::{read_or_empty, write_best_effort, Storage};
use crate::subscription::SubscriptionType;

/// Default storage key for the outbound queue.
pub const QUEUE_STORAGE_KEY: &str = "ws_outgoing_queue";

/// Entries older than this are dropped when a queue is opened (24 hours).
pub const QUEUE_MAX_AGE_MS: u64 = 24 * 60 * 60 * 1_000;

/// A pending outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    /// Opaque unique id, independent of any application message id.
    pub id: String,
    pub payload: ClientMessage,
    /// When the entry was queued, in epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub enqueued_at: u64,
}

/// Loads the queue stored under `key`.
///
/// Missing, unreadable or non-array data loads as an empty queue. Individual
/// entries that no longer parse are skipped.
pub fn load_queue(storage: &dyn Storage, key: &str) -> Vec<QueuedMessage> {
    let Some(raw) = read_or_empty(storage, key) else {
        return Vec::new();
    };
    let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("discarding unreadable outbound queue: {}", e);
            return Vec::new();
        }
    };
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("skipping malformed queue entry: {}", e);
                None
            }
        })
        .collect()
}

/// Persists `entries` under `key`. Failures are logged and ignored.
pub fn save_queue(storage: &dyn Storage, key: &str, entries: &[QueuedMessage]) {
    match serde_json::to_string(entries) {
        Ok(json) => write_best_effort(storage, key, &json),
        Err(e) => tracing::warn!("failed to serialize outbound queue: {}", e),
    }
}

/// Ordered queue of outbound messages with a durable mirror.
pub struct OutboundQueue {
    storage: Arc<dyn Storage>,
    key: String,
    clock: Arc<dyn ClockSource>,
    entries: Vec<QueuedMessage>,
}

impl OutboundQueue {
    /// Opens the queue stored under `key`, loading any previous entries.
    pub fn open(storage: Arc<dyn Storage>, key: impl Into<String>, clock: Arc<dyn ClockSource>) -> Self {
        let key = key.into();
        let entries = load_queue(storage.as_ref(), &key);
        OutboundQueue { storage, key, clock, entries }
    }

    /// Appends `payload` with a fresh id and the current time.
    ///
    /// Returns the id of the new entry.
    pub fn enqueue(&mut self, payload: ClientMessage) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.entries.push(QueuedMessage {
            id: id.clone(),
            payload,
            enqueued_at: self.clock.now_ms(),
        });
        self.persist();
        id
    }

    /// Puts `payloads` back at the head of the queue, ahead of existing entries.
    ///
    /// The payloads keep their relative order. Returns the new entry ids.
    pub fn requeue_front(&mut self, payloads: Vec<ClientMessage>) -> Vec<String> {
        if payloads.is_empty() {
            return Vec::new();
        }
        let now = self.clock.now_ms();
        let front: Vec<QueuedMessage> = payloads
            .into_iter()
            .map(|payload| QueuedMessage { id: uuid::Uuid::new_v4().to_string(), payload, enqueued_at: now })
            .collect();
        let ids = front.iter().map(|entry| entry.id.clone()).collect();
        self.entries.splice(0..0, front);
        self.persist();
        ids
    }

    /// Removes the entry with the given queue id. Returns whether it existed.
    pub fn dequeue(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.persist();
        self.entries.len() != before
    }

    /// Drops entries queued at or before `now - max_age_ms`.
    ///
    /// Returns the number of entries removed.
    pub fn prune_stale(&mut self, max_age_ms: u64) -> usize {
        let cutoff = self.clock.now_ms().saturating_sub(max_age_ms);
        let before = self.entries.len();
        self.entries.retain(|entry| entry.enqueued_at > cutoff);
        self.persist();
        before - self.entries.len()
    }

    /// Drops queued application messages addressed to `(kind, channel)`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_by_channel_and_type(&mut self, channel: &str, kind: SubscriptionType) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| {
            !entry
                .payload
                .as_application()
                .is_some_and(|app| app.channel() == channel && app.kind() == kind)
        });
        self.persist();
        before - self.entries.len()
    }

    /// Whether an application message with `message_id` is waiting in the queue.
    pub fn contains_message(&self, message_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.payload.as_application().is_some_and(|app| app.id() == message_id))
    }

    /// Sends entries in order until `send` reports a failure.
    ///
    /// Sent entries are removed; the failed entry and everything after it
    /// stay queued in their original order. Returns the sent entries.
    pub fn drain<F>(&mut self, mut send: F) -> Vec<QueuedMessage>
    where
        F: FnMut(&ClientMessage) -> bool,
    {
        let sent_count = self.entries.iter().take_while(|entry| send(&entry.payload)).count();
        let sent: Vec<QueuedMessage> = self.entries.drain(..sent_count).collect();
        self.persist();
        sent
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    pub fn entries(&self) -> &[QueuedMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) {
        save_queue(self.storage.as_ref(), &self.key, &self.entries);
    }
}

impl std::fmt::Debug for OutboundQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundQueue")
            .field("key", &self.key)
            .field("entries", &self.entries)
            .finish()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
