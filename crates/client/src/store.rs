// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Message store: reconciles server deliveries with local optimistic state.
//!
//! Holds per-channel conversation messages and notifications, the
//! subscription ref counts of the consumer layer, the last error and a
//! mirror of the connection state. Failed messages are mirrored into the
//! durable [`FailedMessageStore`] so they survive a restart:
//! - a conversation error marks the referenced message `failed` and persists it
//! - a dump drops every persisted failure the server has since confirmed and
//!   appends the rest after the dump
//! - confirming any optimistic message dismisses all failures in its channel
//!
//! Every mutation is tagged with a [`StoreAction`] and reported to change
//! listeners together with the new state.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use sl_core::{
    ChannelMessage, ChannelNotification, ConversationDelivery, ConversationErrorKind,
    FailedMessageStore, InboundMessage, MessageStatus, NotificationDelivery, ServerMessage,
    SocketError, SubscriptionKey, SubscriptionType,
};
use tracing::debug;

use crate::manager::ConnectionState;

/// Names the mutation that produced a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreAction {
    ConversationDump,
    ConversationEvent,
    ConversationError,
    NotificationDump,
    NotificationEvent,
    ProtocolError,
    AddOptimisticMessage,
    SetMessageStatus,
    SetConnectionState,
    IncrementRefCount,
    DecrementRefCount,
    SetPendingQueueLength,
    SetLastError,
}

impl StoreAction {
    pub fn name(&self) -> &'static str {
        match self {
            StoreAction::ConversationDump => "serverMessage/conversation-dump",
            StoreAction::ConversationEvent => "serverMessage/conversation-event",
            StoreAction::ConversationError => "serverMessage/conversation-error",
            StoreAction::NotificationDump => "serverMessage/notification-dump",
            StoreAction::NotificationEvent => "serverMessage/notification-event",
            StoreAction::ProtocolError => "serverMessage/protocol-error",
            StoreAction::AddOptimisticMessage => "addOptimisticMessage",
            StoreAction::SetMessageStatus => "setMessageStatus",
            StoreAction::SetConnectionState => "setConnectionState",
            StoreAction::IncrementRefCount => "incrementRefCount",
            StoreAction::DecrementRefCount => "decrementRefCount",
            StoreAction::SetPendingQueueLength => "setPendingQueueLength",
            StoreAction::SetLastError => "setLastError",
        }
    }
}

impl std::fmt::Display for StoreAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The most recent error, from either a protocol envelope or a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ConversationErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl From<&SocketError> for LastError {
    fn from(error: &SocketError) -> Self {
        LastError {
            code: Some(error.code),
            message: error.message.clone(),
            channel: error.channel.clone(),
            error: None,
            message_id: error.message_id.clone(),
        }
    }
}

/// Data held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreState {
    pub connection_state: ConnectionState,
    /// Set once the connection has ever been established.
    pub has_connected: bool,
    /// Set once the connection has ever dropped or an error was reported.
    pub has_disconnected: bool,
    pub conversation_messages: BTreeMap<String, Vec<ChannelMessage>>,
    pub notification_messages: BTreeMap<String, Vec<ChannelNotification>>,
    pub subscription_ref_counts: BTreeMap<SubscriptionKey, u32>,
    pub pending_queue_length: usize,
    pub last_error: Option<LastError>,
}

impl Default for StoreState {
    fn default() -> Self {
        StoreState {
            connection_state: ConnectionState::Disconnected,
            has_connected: false,
            has_disconnected: false,
            conversation_messages: BTreeMap::new(),
            notification_messages: BTreeMap::new(),
            subscription_ref_counts: BTreeMap::new(),
            pending_queue_length: 0,
            last_error: None,
        }
    }
}

pub type ChangeListener = Box<dyn FnMut(StoreAction, &StoreState) + Send>;

/// Client-side view of every subscribed channel.
pub struct MessageStore {
    state: StoreState,
    failed: FailedMessageStore,
    listeners: Vec<ChangeListener>,
}

impl MessageStore {
    pub fn new(failed: FailedMessageStore) -> Self {
        MessageStore { state: StoreState::default(), failed, listeners: Vec::new() }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn failed_messages(&self) -> &FailedMessageStore {
        &self.failed
    }

    /// Registers a listener called after every mutation.
    pub fn add_change_listener(&mut self, f: impl FnMut(StoreAction, &StoreState) + Send + 'static) {
        self.listeners.push(Box::new(f));
    }

    fn changed(&mut self, action: StoreAction) {
        debug!("store: {}", action);
        for listener in self.listeners.iter_mut() {
            listener(action, &self.state);
        }
    }

    // --- server deliveries ---

    /// Reconciles one inbound message. Pongs and acks leave the store untouched.
    pub fn handle_server_message(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Message(InboundMessage::Conversation(delivery)) => {
                self.handle_conversation(delivery)
            }
            ServerMessage::Message(InboundMessage::Notification(delivery)) => {
                self.handle_notification(delivery)
            }
            ServerMessage::Error(error) => {
                self.state.last_error = Some(LastError::from(error));
                self.changed(StoreAction::ProtocolError);
            }
            ServerMessage::Pong { .. }
            | ServerMessage::SubscribeAck(_)
            | ServerMessage::UnsubscribeAck(_) => {}
        }
    }

    fn handle_conversation(&mut self, delivery: &ConversationDelivery) {
        match delivery {
            ConversationDelivery::Dump { channel, messages } => {
                let dump_ids: HashSet<&str> = messages.iter().map(|m| m.id.as_str()).collect();
                let still_failed: Vec<ChannelMessage> = self
                    .failed
                    .channel(channel)
                    .into_iter()
                    .filter(|m| !dump_ids.contains(m.id.as_str()))
                    .collect();
                self.failed.set_channel(channel, still_failed.clone());

                let mut merged: Vec<ChannelMessage> = messages
                    .iter()
                    .cloned()
                    .map(|m| ChannelMessage::from_stored(m, MessageStatus::Sent))
                    .collect();
                merged.extend(still_failed);
                self.state.conversation_messages.insert(channel.clone(), merged);
                self.changed(StoreAction::ConversationDump);
            }
            ConversationDelivery::Event { id, channel, sender, content } => {
                let existing = self.state.conversation_messages.entry(channel.clone()).or_default();
                match existing.iter().position(|m| &m.id == id) {
                    Some(index) => {
                        existing[index].status = MessageStatus::Sent;
                        existing.retain(|m| m.status != MessageStatus::Failed);
                        self.failed.clear_channel(channel);
                    }
                    None => existing.push(ChannelMessage {
                        id: id.clone(),
                        sender: sender.clone(),
                        content: content.clone(),
                        status: MessageStatus::Sent,
                    }),
                }
                self.changed(StoreAction::ConversationEvent);
            }
            ConversationDelivery::Error { channel, error, message, message_id } => {
                self.state.last_error = Some(LastError {
                    code: None,
                    message: message.clone(),
                    channel: Some(channel.clone()),
                    error: Some(*error),
                    message_id: message_id.clone(),
                });
                if let Some(id) = message_id {
                    let failed = self
                        .state
                        .conversation_messages
                        .get_mut(channel)
                        .and_then(|messages| messages.iter_mut().find(|m| &m.id == id))
                        .map(|m| {
                            m.status = MessageStatus::Failed;
                            m.clone()
                        });
                    if let Some(failed) = failed {
                        self.failed.add(channel, failed);
                    }
                }
                self.changed(StoreAction::ConversationError);
            }
        }
    }

    fn handle_notification(&mut self, delivery: &NotificationDelivery) {
        match delivery {
            NotificationDelivery::Dump { channel, notifications } => {
                self.state.notification_messages.insert(channel.clone(), notifications.clone());
                self.changed(StoreAction::NotificationDump);
            }
            NotificationDelivery::Event { id, channel, title, body, timestamp } => {
                self.state.notification_messages.entry(channel.clone()).or_default().push(
                    ChannelNotification {
                        id: id.clone(),
                        title: title.clone(),
                        body: body.clone(),
                        timestamp: timestamp.clone(),
                    },
                );
                self.changed(StoreAction::NotificationEvent);
            }
        }
    }

    // --- local mutations ---

    /// Appends a message before the server has seen it.
    pub fn add_optimistic_message(&mut self, channel: &str, message: ChannelMessage) {
        self.state.conversation_messages.entry(channel.to_string()).or_default().push(message);
        self.changed(StoreAction::AddOptimisticMessage);
    }

    /// Changes a message's status. Leaving `failed` also forgets the
    /// persisted failure. Unknown ids are ignored.
    pub fn set_message_status(&mut self, channel: &str, message_id: &str, status: MessageStatus) {
        let Some(message) = self
            .state
            .conversation_messages
            .get_mut(channel)
            .and_then(|messages| messages.iter_mut().find(|m| m.id == message_id))
        else {
            return;
        };
        let previous = std::mem::replace(&mut message.status, status);
        if previous == MessageStatus::Failed && status != MessageStatus::Failed {
            self.failed.remove(channel, message_id);
        }
        self.changed(StoreAction::SetMessageStatus);
    }

    pub fn set_connection_state(&mut self, state: ConnectionState) {
        self.state.connection_state = state;
        self.state.has_connected |= state == ConnectionState::Connected;
        self.state.has_disconnected |=
            matches!(state, ConnectionState::Disconnected | ConnectionState::Reconnecting);
        self.changed(StoreAction::SetConnectionState);
    }

    pub fn increment_ref_count(&mut self, key: &SubscriptionKey) {
        *self.state.subscription_ref_counts.entry(key.clone()).or_insert(0) += 1;
        self.changed(StoreAction::IncrementRefCount);
    }

    /// Drops one reference. The last one also clears that channel's view for
    /// the key's type only.
    pub fn decrement_ref_count(&mut self, key: &SubscriptionKey) {
        let Some(current) = self.state.subscription_ref_counts.get(key).copied() else {
            return;
        };
        if current > 1 {
            self.state.subscription_ref_counts.insert(key.clone(), current - 1);
        } else {
            self.state.subscription_ref_counts.remove(key);
            match key.kind {
                SubscriptionType::Conversation => {
                    self.state.conversation_messages.remove(&key.channel);
                }
                SubscriptionType::Notification => {
                    self.state.notification_messages.remove(&key.channel);
                }
            }
        }
        self.changed(StoreAction::DecrementRefCount);
    }

    pub fn set_pending_queue_length(&mut self, length: usize) {
        self.state.pending_queue_length = length;
        self.changed(StoreAction::SetPendingQueueLength);
    }

    /// Records or clears the last error. Recording one also counts as a disconnect.
    pub fn set_last_error(&mut self, error: Option<&SocketError>) {
        self.state.last_error = error.map(LastError::from);
        self.state.has_disconnected |= error.is_some();
        self.changed(StoreAction::SetLastError);
    }

    // --- selectors ---

    /// Messages of a conversation channel; empty for unknown channels.
    pub fn conversation_messages(&self, channel: &str) -> &[ChannelMessage] {
        self.state.conversation_messages.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Notifications of a channel; empty for unknown channels.
    pub fn notifications(&self, channel: &str) -> &[ChannelNotification] {
        self.state.notification_messages.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.connection_state
    }

    pub fn is_subscribed(&self, kind: SubscriptionType, channel: &str) -> bool {
        self.state
            .subscription_ref_counts
            .get(&SubscriptionKey::new(kind, channel))
            .is_some_and(|count| *count > 0)
    }

    pub fn last_error(&self) -> Option<&LastError> {
        self.state.last_error.as_ref()
    }

    pub fn has_connected(&self) -> bool {
        self.state.has_connected
    }

    pub fn has_disconnected(&self) -> bool {
        self.state.has_disconnected
    }

    pub fn pending_queue_length(&self) -> usize {
        self.state.pending_queue_length
    }
}

/// Locks a mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
