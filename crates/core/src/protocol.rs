// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages for client-server communication.
//!
//! Every frame is one JSON object discriminated by its `action` field:
//! - Client sends pings, subscribe/unsubscribe requests and application messages
//! - Server answers with pongs, acks, channel deliveries (event, dump, error)
//!   and protocol-level error envelopes
//!
//! [`ClientMessage::to_json`] and [`ServerMessage::from_json`] are the only
//! translation points between frames and typed messages.

use serde::{Deserialize, Serialize};

use crate::message::{ChannelNotification, ContentBlock, StoredMessage};
use crate::subscription::{SubscriptionKey, SubscriptionType};

/// Close and error codes with a fixed meaning.
pub mod codes {
    /// Clean, intended closure. Never triggers a reconnect.
    pub const NORMAL_CLOSURE: u16 = 1000;
    /// Connection dropped without a close frame.
    pub const ABNORMAL_CLOSURE: u16 = 1006;
    /// Local liveness failure: no pong before the timeout.
    pub const HEARTBEAT_TIMEOUT: u16 = 4000;
    /// Local usage error: application message for a channel with no subscription.
    pub const NOT_SUBSCRIBED: u16 = 4001;
    /// Local fatal error: reconnection attempts exhausted.
    pub const MAX_RECONNECT_ATTEMPTS: u16 = 4002;
}

/// `(type, channel)` as carried by subscribe/unsubscribe frames and their acks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    #[serde(rename = "type")]
    pub kind: SubscriptionType,
    pub channel: String,
}

impl ChannelRef {
    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.kind, self.channel.clone())
    }
}

impl From<&SubscriptionKey> for ChannelRef {
    fn from(key: &SubscriptionKey) -> Self {
        ChannelRef { kind: key.kind, channel: key.channel.clone() }
    }
}

/// Channel-scoped application messages sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Conversation {
        id: String,
        channel: String,
        message: String,
    },
}

impl OutboundMessage {
    pub fn id(&self) -> &str {
        match self {
            OutboundMessage::Conversation { id, .. } => id,
        }
    }

    pub fn channel(&self) -> &str {
        match self {
            OutboundMessage::Conversation { channel, .. } => channel,
        }
    }

    pub fn kind(&self) -> SubscriptionType {
        match self {
            OutboundMessage::Conversation { .. } => SubscriptionType::Conversation,
        }
    }

    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.kind(), self.channel())
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keepalive. The server echoes the timestamp in a pong.
    Ping { timestamp: String },

    Subscribe(ChannelRef),

    Unsubscribe(ChannelRef),

    /// Application message. Tracked in-flight until acknowledged.
    Message(OutboundMessage),
}

impl ClientMessage {
    /// Creates a Ping message.
    pub fn ping(timestamp: impl Into<String>) -> Self {
        ClientMessage::Ping { timestamp: timestamp.into() }
    }

    /// Creates a Subscribe message.
    pub fn subscribe(key: &SubscriptionKey) -> Self {
        ClientMessage::Subscribe(key.into())
    }

    /// Creates an Unsubscribe message.
    pub fn unsubscribe(key: &SubscriptionKey) -> Self {
        ClientMessage::Unsubscribe(key.into())
    }

    /// Creates a conversation message.
    pub fn conversation(
        id: impl Into<String>,
        channel: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ClientMessage::Message(OutboundMessage::Conversation {
            id: id.into(),
            channel: channel.into(),
            message: message.into(),
        })
    }

    /// The application message carried by this frame, if any.
    pub fn as_application(&self) -> Option<&OutboundMessage> {
        match self {
            ClientMessage::Message(msg) => Some(msg),
            _ => None,
        }
    }

    /// Short name of the frame's action, for logs.
    pub fn action(&self) -> &'static str {
        match self {
            ClientMessage::Ping { .. } => "ping",
            ClientMessage::Subscribe(_) => "subscribe",
            ClientMessage::Unsubscribe(_) => "unsubscribe",
            ClientMessage::Message(_) => "message",
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Reason a conversation message was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationErrorKind {
    TokenExpired,
    GeneralError,
    #[serde(other)]
    Unknown,
}

/// Conversation deliveries from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "delivery", rename_all = "snake_case")]
pub enum ConversationDelivery {
    /// One new or echoed message.
    Event {
        id: String,
        channel: String,
        sender: String,
        content: Vec<ContentBlock>,
    },

    /// Full channel history, sent on subscribe.
    Dump {
        channel: String,
        messages: Vec<StoredMessage>,
    },

    /// Business rejection of a message.
    Error {
        channel: String,
        error: ConversationErrorKind,
        message: String,
        #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
}

impl ConversationDelivery {
    pub fn channel(&self) -> &str {
        match self {
            ConversationDelivery::Event { channel, .. }
            | ConversationDelivery::Dump { channel, .. }
            | ConversationDelivery::Error { channel, .. } => channel,
        }
    }
}

/// Notification deliveries from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "delivery", rename_all = "snake_case")]
pub enum NotificationDelivery {
    Event {
        id: String,
        channel: String,
        title: String,
        body: String,
        timestamp: String,
    },

    Dump {
        channel: String,
        notifications: Vec<ChannelNotification>,
    },
}

impl NotificationDelivery {
    pub fn channel(&self) -> &str {
        match self {
            NotificationDelivery::Event { channel, .. }
            | NotificationDelivery::Dump { channel, .. } => channel,
        }
    }
}

/// Channel deliveries, discriminated by subscription type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Conversation(ConversationDelivery),
    Notification(NotificationDelivery),
}

/// Protocol-level error envelope (`action: "error"`).
///
/// Also used for errors raised locally by the connection manager, see [`codes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketError {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SubscriptionType>,
    #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl SocketError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        SocketError { code, message: message.into(), channel: None, kind: None, message_id: None }
    }

    /// Error for an application message sent without an active subscription.
    pub fn not_subscribed(key: &SubscriptionKey) -> Self {
        SocketError {
            code: codes::NOT_SUBSCRIBED,
            message: format!("Not subscribed to {key}"),
            channel: Some(key.channel.clone()),
            kind: Some(key.kind),
            message_id: None,
        }
    }

    /// Error raised once reconnection gives up.
    pub fn max_reconnect_attempts() -> Self {
        SocketError::new(codes::MAX_RECONNECT_ATTEMPTS, "Max reconnection attempts reached")
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Pong response to client Ping; echoes its timestamp.
    Pong { timestamp: String },

    SubscribeAck(ChannelRef),

    UnsubscribeAck(ChannelRef),

    Message(InboundMessage),

    Error(SocketError),
}

impl ServerMessage {
    /// Creates a Pong message.
    pub fn pong(timestamp: impl Into<String>) -> Self {
        ServerMessage::Pong { timestamp: timestamp.into() }
    }

    /// Creates a conversation event.
    pub fn conversation_event(
        id: impl Into<String>,
        channel: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        ServerMessage::Message(InboundMessage::Conversation(ConversationDelivery::Event {
            id: id.into(),
            channel: channel.into(),
            sender: sender.into(),
            content: vec![ContentBlock::text(text)],
        }))
    }

    /// Creates a conversation dump.
    pub fn conversation_dump(channel: impl Into<String>, messages: Vec<StoredMessage>) -> Self {
        ServerMessage::Message(InboundMessage::Conversation(ConversationDelivery::Dump {
            channel: channel.into(),
            messages,
        }))
    }

    /// Creates a conversation error.
    pub fn conversation_error(
        channel: impl Into<String>,
        error: ConversationErrorKind,
        message: impl Into<String>,
        message_id: Option<String>,
    ) -> Self {
        ServerMessage::Message(InboundMessage::Conversation(ConversationDelivery::Error {
            channel: channel.into(),
            error,
            message: message.into(),
            message_id,
        }))
    }

    /// Creates a notification event.
    pub fn notification_event(channel: impl Into<String>, notification: ChannelNotification) -> Self {
        ServerMessage::Message(InboundMessage::Notification(NotificationDelivery::Event {
            id: notification.id,
            channel: channel.into(),
            title: notification.title,
            body: notification.body,
            timestamp: notification.timestamp,
        }))
    }

    /// Creates a notification dump.
    pub fn notification_dump(
        channel: impl Into<String>,
        notifications: Vec<ChannelNotification>,
    ) -> Self {
        ServerMessage::Message(InboundMessage::Notification(NotificationDelivery::Dump {
            channel: channel.into(),
            notifications,
        }))
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
