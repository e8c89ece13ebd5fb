// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the client runtime.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by the client runtime.
#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Core(#[from] sl_core::Error),

    /// The manager task has stopped and no longer accepts commands.
    #[error("connection manager is no longer running")]
    ManagerGone,

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
