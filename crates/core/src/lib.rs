// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! sl-core: Shared library for the sockline pub/sub client
//!
//! This crate provides the wire protocol, the channel message types, the
//! durable storage contract and the two best-effort durable stores (outbound
//! queue and failed messages) used by the connection manager and the message
//! store in `sl-client`.

pub mod clock;
pub mod error;
pub mod failed;
pub mod message;
pub mod protocol;
pub mod queue;
pub mod storage;
pub mod subscription;

#[cfg(test)]
mod test_helpers;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use failed::{FailedMessageStore, FAILED_MESSAGES_STORAGE_KEY};
pub use message::{ChannelMessage, ChannelNotification, ContentBlock, MessageStatus, StoredMessage};
pub use protocol::{
    codes, ChannelRef, ClientMessage, ConversationDelivery, ConversationErrorKind, InboundMessage,
    NotificationDelivery, OutboundMessage, ServerMessage, SocketError,
};
pub use queue::{OutboundQueue, QueuedMessage, QUEUE_MAX_AGE_MS, QUEUE_STORAGE_KEY};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, StorageResult};
pub use subscription::{SubscriptionKey, SubscriptionType};
