// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer layer: a client owning the manager task and the store, and
//! per-channel subscription guards.
//!
//! A subscription guard holds one reference on its channel for as long as it
//! lives. Creating it increments the store's ref count and subscribes through
//! the manager; dropping it unsubscribes and decrements.

use std::sync::{Arc, Mutex};

use sl_core::{
    ChannelMessage, ChannelNotification, ClientMessage, FailedMessageStore, MessageStatus,
    SubscriptionKey, SubscriptionType,
};
use tracing::{debug, warn};

use crate::config::ManagerConfig;
use crate::error::Result;
use crate::manager::{ConnectionManager, ConnectionState, ManagerCallbacks, ManagerOptions};
use crate::runtime::{spawn_manager, ManagerHandle};
use crate::store::{lock, MessageStore, StoreState};
use crate::transport::{Transport, WebSocketTransport};

/// Sender name used for messages typed locally.
pub const LOCAL_SENDER: &str = "user";

pub type SharedStore = Arc<Mutex<MessageStore>>;

/// Running manager plus the store it feeds.
#[derive(Clone)]
pub struct SocketClient {
    handle: ManagerHandle,
    store: SharedStore,
}

impl SocketClient {
    /// Starts a client over WebSocket. Must be called within a tokio runtime.
    ///
    /// Callbacks in `options` run after the store has been updated.
    pub fn start(config: ManagerConfig, options: ManagerOptions) -> Result<Self> {
        Self::start_with_transport(config, WebSocketTransport::new(), options)
    }

    pub fn start_with_transport<T>(config: ManagerConfig, transport: T, options: ManagerOptions) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let ManagerOptions { storage, clock, callbacks } = options;
        let failed = FailedMessageStore::new(Arc::clone(&storage), config.failed_storage_key.clone());
        let store: SharedStore = Arc::new(Mutex::new(MessageStore::new(failed)));
        let callbacks = feed_store(&store, callbacks);
        let manager =
            ConnectionManager::with_transport(config, transport, ManagerOptions { storage, clock, callbacks })?;
        lock(&store).set_pending_queue_length(manager.queued().len());
        Ok(SocketClient { handle: spawn_manager(manager), store })
    }

    pub fn connect(&self) -> Result<()> {
        self.handle.connect()
    }

    pub fn disconnect(&self) -> Result<()> {
        self.handle.disconnect()
    }

    pub fn dispose(&self) -> Result<()> {
        self.handle.dispose()
    }

    pub fn handle(&self) -> &ManagerHandle {
        &self.handle
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Copy of the current store state.
    pub fn state(&self) -> StoreState {
        lock(&self.store).state().clone()
    }

    /// Mirrors the manager's queue length into the store.
    pub async fn refresh_queue_length(&self) -> Result<usize> {
        let length = self.handle.queue_len().await?;
        lock(&self.store).set_pending_queue_length(length);
        Ok(length)
    }

    pub fn conversation(&self, channel: &str) -> ConversationSubscription {
        ConversationSubscription { guard: ChannelGuard::acquire(self, SubscriptionType::Conversation, channel) }
    }

    pub fn notification(&self, channel: &str) -> NotificationSubscription {
        NotificationSubscription { guard: ChannelGuard::acquire(self, SubscriptionType::Notification, channel) }
    }
}

/// Routes manager callbacks into the store, then to `user`.
fn feed_store(store: &SharedStore, user: ManagerCallbacks) -> ManagerCallbacks {
    let ManagerCallbacks { mut on_message, mut on_connection_state_change, mut on_error } = user;
    let (messages, states, errors) = (Arc::clone(store), Arc::clone(store), Arc::clone(store));
    ManagerCallbacks::new()
        .on_message(move |message| {
            lock(&messages).handle_server_message(message);
            if let Some(cb) = on_message.as_mut() {
                cb(message);
            }
        })
        .on_connection_state_change(move |state| {
            lock(&states).set_connection_state(state);
            if let Some(cb) = on_connection_state_change.as_mut() {
                cb(state);
            }
        })
        .on_error(move |error| {
            lock(&errors).set_last_error(Some(error));
            if let Some(cb) = on_error.as_mut() {
                cb(error);
            }
        })
}

/// One reference on a channel, released on drop.
struct ChannelGuard {
    client: SocketClient,
    key: SubscriptionKey,
}

impl ChannelGuard {
    fn acquire(client: &SocketClient, kind: SubscriptionType, channel: &str) -> Self {
        let key = SubscriptionKey::new(kind, channel);
        lock(&client.store).increment_ref_count(&key);
        if let Err(e) = client.handle.subscribe(kind, channel) {
            warn!("Failed to subscribe to {}: {}", key, e);
        }
        ChannelGuard { client: client.clone(), key }
    }

    fn store(&self) -> std::sync::MutexGuard<'_, MessageStore> {
        lock(&self.client.store)
    }

    fn is_subscribed(&self) -> bool {
        self.store().is_subscribed(self.key.kind, &self.key.channel)
    }

    fn connection_state(&self) -> ConnectionState {
        self.store().connection_state()
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        if let Err(e) = self.client.handle.unsubscribe(self.key.kind, &self.key.channel) {
            debug!("unsubscribe from {} skipped: {}", self.key, e);
        }
        self.store().decrement_ref_count(&self.key);
    }
}

/// A live conversation channel.
pub struct ConversationSubscription {
    guard: ChannelGuard,
}

impl ConversationSubscription {
    pub fn channel(&self) -> &str {
        &self.guard.key.channel
    }

    pub fn messages(&self) -> Vec<ChannelMessage> {
        self.guard.store().conversation_messages(self.channel()).to_vec()
    }

    pub fn is_subscribed(&self) -> bool {
        self.guard.is_subscribed()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.guard.connection_state()
    }

    /// Shows `text` immediately as pending, then sends it.
    ///
    /// Returns the new message id and whether the frame was written. A
    /// message that could not be written is marked failed.
    pub async fn send_message(&self, text: &str) -> Result<(String, bool)> {
        let id = uuid::Uuid::new_v4().to_string();
        self.guard
            .store()
            .add_optimistic_message(self.channel(), ChannelMessage::pending(&id, LOCAL_SENDER, text));
        let sent = self.send(&id, text).await?;
        Ok((id, sent))
    }

    /// Resends a failed message. Returns false if `message_id` is not failed.
    pub async fn retry_message(&self, message_id: &str) -> Result<bool> {
        let text = self
            .guard
            .store()
            .conversation_messages(self.channel())
            .iter()
            .find(|m| m.id == message_id && m.status == MessageStatus::Failed)
            .map(ChannelMessage::text);
        let Some(text) = text else {
            return Ok(false);
        };
        self.resend(message_id, &text).await
    }

    /// Resends every failed message in order. Returns how many were written.
    pub async fn retry_all(&self) -> Result<usize> {
        let failed: Vec<(String, String)> = self
            .guard
            .store()
            .conversation_messages(self.channel())
            .iter()
            .filter(|m| m.status == MessageStatus::Failed)
            .map(|m| (m.id.clone(), m.text()))
            .collect();
        let mut written = 0;
        for (id, text) in failed {
            if self.resend(&id, &text).await? {
                written += 1;
            }
        }
        Ok(written)
    }

    async fn resend(&self, message_id: &str, text: &str) -> Result<bool> {
        self.guard.store().set_message_status(self.channel(), message_id, MessageStatus::Pending);
        self.send(message_id, text).await
    }

    async fn send(&self, message_id: &str, text: &str) -> Result<bool> {
        let client = &self.guard.client;
        let result = client.handle.send(ClientMessage::conversation(message_id, self.channel(), text)).await;
        if !matches!(result, Ok(true)) {
            self.guard.store().set_message_status(self.channel(), message_id, MessageStatus::Failed);
        }
        if let Err(e) = client.refresh_queue_length().await {
            debug!("queue length not refreshed: {}", e);
        }
        result
    }
}

/// A live notification channel.
pub struct NotificationSubscription {
    guard: ChannelGuard,
}

impl NotificationSubscription {
    pub fn channel(&self) -> &str {
        &self.guard.key.channel
    }

    pub fn notifications(&self) -> Vec<ChannelNotification> {
        self.guard.store().notifications(self.channel()).to_vec()
    }

    pub fn is_subscribed(&self) -> bool {
        self.guard.is_subscribed()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.guard.connection_state()
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
