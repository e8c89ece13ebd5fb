// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! sl-client: Resilient pub/sub WebSocket client
//!
//! The [`ConnectionManager`] owns one socket and keeps it alive: heartbeat,
//! backoff reconnection, ref-counted subscriptions restored on reconnect, and
//! an offline queue drained once connected. [`spawn_manager`] runs it on a
//! tokio task behind a cloneable [`ManagerHandle`].
//!
//! On top of that, [`MessageStore`] reconciles inbound deliveries with
//! optimistic local sends, and [`SocketClient`] hands out per-channel
//! subscription guards.

pub mod config;
pub mod error;
pub mod hooks;
pub mod inspector;
pub mod manager;
pub mod runtime;
pub mod status;
pub mod store;
pub mod transport;

#[cfg(test)]
mod test_helpers;


pub use config::ManagerConfig;
pub use error::{Error, Result};
pub use hooks::{ConversationSubscription, NotificationSubscription, SharedStore, SocketClient};
pub use inspector::{compute_diff, DiffEntry, DiffKind, OutgoingLog, StateRecorder, StateSnapshot};
pub use manager::{
    ConnectionManager, ConnectionState, InFlightMessage, ListenerId, ManagerCallbacks,
    ManagerOptions, ManagerSnapshot,
};
pub use runtime::{spawn_manager, ManagerHandle, TokioClock};
pub use status::{connection_status, ConnectionStatus, ConnectionStatusTracker};
pub use store::{LastError, MessageStore, StoreAction, StoreState};
pub use transport::{ReadyState, Transport, TransportError, TransportEvent, WebSocketTransport};
