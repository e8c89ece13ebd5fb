// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing connection status line.

use crate::manager::ConnectionState;
use crate::store::StoreState;

/// What a status banner should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Hidden,
    Visible { state: ConnectionState, message: String },
}

impl ConnectionStatus {
    fn visible(state: ConnectionState, message: impl Into<String>) -> Self {
        ConnectionStatus::Visible { state, message: message.into() }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, ConnectionStatus::Visible { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ConnectionStatus::Hidden => None,
            ConnectionStatus::Visible { message, .. } => Some(message),
        }
    }
}

/// Derives the banner from store state.
///
/// `has_had_error` is whether an error has ever been observed; it turns a
/// plain "connected" into "Back online".
pub fn connection_status(state: &StoreState, has_had_error: bool) -> ConnectionStatus {
    if let Some(error) = &state.last_error {
        return ConnectionStatus::visible(ConnectionState::Disconnected, error.message.clone());
    }
    match state.connection_state {
        ConnectionState::Connected if has_had_error => {
            ConnectionStatus::visible(ConnectionState::Connected, "Back online")
        }
        ConnectionState::Reconnecting => {
            ConnectionStatus::visible(ConnectionState::Reconnecting, "Reconnecting...")
        }
        ConnectionState::Disconnected => {
            ConnectionStatus::visible(ConnectionState::Disconnected, "Connection lost")
        }
        ConnectionState::Connected | ConnectionState::Connecting => ConnectionStatus::Hidden,
    }
}

/// Remembers whether an error was ever seen across successive states.
#[derive(Debug, Default, Clone)]
pub struct ConnectionStatusTracker {
    has_had_error: bool,
}

impl ConnectionStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, state: &StoreState) -> ConnectionStatus {
        self.has_had_error |= state.last_error.is_some();
        connection_status(state, self.has_had_error)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
