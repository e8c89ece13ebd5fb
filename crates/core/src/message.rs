// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Channel message and notification types shared by the wire protocol and
//! the client-side stores.

use serde::{Deserialize, Serialize};

/// A single block of conversation content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            ContentBlock::Text { text } => text,
        }
    }
}

/// A conversation message as the server stores it (dump entries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub sender: String,
    pub content: Vec<ContentBlock>,
}

/// Delivery status of a conversation message on this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Inserted optimistically, awaiting server confirmation.
    Pending,
    /// Confirmed by the server (dump or echoed event).
    Sent,
    /// Explicitly rejected by the server.
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversation message in a channel view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub id: String,
    pub sender: String,
    pub content: Vec<ContentBlock>,
    pub status: MessageStatus,
}

impl ChannelMessage {
    /// Creates a pending single-block text message.
    pub fn pending(id: impl Into<String>, sender: impl Into<String>, text: impl Into<String>) -> Self {
        ChannelMessage {
            id: id.into(),
            sender: sender.into(),
            content: vec![ContentBlock::text(text)],
            status: MessageStatus::Pending,
        }
    }

    pub fn from_stored(stored: StoredMessage, status: MessageStatus) -> Self {
        ChannelMessage { id: stored.id, sender: stored.sender, content: stored.content, status }
    }

    /// Concatenated text of every content block.
    pub fn text(&self) -> String {
        self.content.iter().map(ContentBlock::as_text).collect()
    }
}

/// A notification in a channel view. Append-only; replaced wholesale on dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelNotification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub timestamp: String,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
