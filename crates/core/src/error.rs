// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for sl-core operations.

use thiserror::Error;

use crate::storage::StorageError;

/// All possible errors that can occur in sl-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid subscription key: '{0}'\n  hint: keys are written as <type>:<channel>")]
    InvalidSubscriptionKey(String),

    #[error("invalid subscription type: '{0}'\n  hint: valid types are: conversation, notification")]
    InvalidSubscriptionType(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for sl-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
