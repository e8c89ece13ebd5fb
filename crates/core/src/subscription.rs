// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription types and keys.
//!
//! A subscription is identified by `(type, channel)` and written as the string
//! `"type:channel"`. Only the first colon separates the two, so channel names
//! may themselves contain colons.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of channel a consumer can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionType {
    Conversation,
    Notification,
}

impl SubscriptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionType::Conversation => "conversation",
            SubscriptionType::Notification => "notification",
        }
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conversation" => Ok(SubscriptionType::Conversation),
            "notification" => Ok(SubscriptionType::Notification),
            other => Err(Error::InvalidSubscriptionType(other.to_string())),
        }
    }
}

/// `(type, channel)` pair identifying one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubscriptionKey {
    pub kind: SubscriptionType,
    pub channel: String,
}

impl SubscriptionKey {
    pub fn new(kind: SubscriptionType, channel: impl Into<String>) -> Self {
        SubscriptionKey { kind, channel: channel.into() }
    }

    pub fn conversation(channel: impl Into<String>) -> Self {
        Self::new(SubscriptionType::Conversation, channel)
    }

    pub fn notification(channel: impl Into<String>) -> Self {
        Self::new(SubscriptionType::Notification, channel)
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.channel)
    }
}

impl FromStr for SubscriptionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, channel) =
            s.split_once(':').ok_or_else(|| Error::InvalidSubscriptionKey(s.to_string()))?;
        Ok(SubscriptionKey { kind: kind.parse()?, channel: channel.to_string() })
    }
}

impl TryFrom<String> for SubscriptionKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubscriptionKey> for String {
    fn from(key: SubscriptionKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
