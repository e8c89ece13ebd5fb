// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::collections::BTreeMap;
use yare::parameterized;

#[parameterized(
    conversation = { "conversation:ch1", SubscriptionType::Conversation, "ch1" },
    notification = { "notification:alerts", SubscriptionType::Notification, "alerts" },
    colon_in_channel = { "conversation:room:42", SubscriptionType::Conversation, "room:42" },
    empty_channel = { "notification:", SubscriptionType::Notification, "" },
)]
fn parse_key(input: &str, kind: SubscriptionType, channel: &str) {
    let key: SubscriptionKey = input.parse().unwrap();
    assert_eq!(key.kind, kind);
    assert_eq!(key.channel, channel);
    assert_eq!(key.to_string(), input);
}

#[parameterized(
    no_colon = { "conversation" },
    unknown_type = { "presence:ch1" },
    empty = { "" },
)]
fn parse_key_rejects(input: &str) {
    assert!(input.parse::<SubscriptionKey>().is_err());
}

#[test]
fn key_serializes_as_string() {
    let mut counts = BTreeMap::new();
    counts.insert(SubscriptionKey::conversation("ch1"), 2u32);
    let json = serde_json::to_string(&counts).unwrap();
    assert_eq!(json, r#"{"conversation:ch1":2}"#);

    let back: BTreeMap<SubscriptionKey, u32> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, counts);
}

#[test]
fn same_channel_different_type_are_distinct() {
    assert_ne!(SubscriptionKey::conversation("x"), SubscriptionKey::notification("x"));
}
