// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the failed-message store.

#![allow(clippy::unwrap_used)]

use super::*;
use crate::message::MessageStatus;
use crate::storage::MemoryStorage;
use crate::test_helpers::BrokenStorage;
use yare::parameterized;

fn failed(id: &str) -> ChannelMessage {
    ChannelMessage { status: MessageStatus::Failed, ..ChannelMessage::pending(id, "user", id) }
}

fn store() -> (FailedMessageStore, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    (FailedMessageStore::new(storage.clone(), FAILED_MESSAGES_STORAGE_KEY), storage)
}

fn ids(messages: &[ChannelMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}

#[test]
fn load_all_empty_when_nothing_stored() {
    let (store, _) = store();
    assert!(store.load_all().is_empty());
}

#[parameterized(
    corrupt = { "{oops" },
    array = { "[1,2]" },
    number = { "42" },
    null = { "null" },
)]
fn load_all_tolerates_bad_data(raw: &str) {
    let (store, storage) = store();
    storage.set(FAILED_MESSAGES_STORAGE_KEY, raw).unwrap();
    assert!(store.load_all().is_empty());
}

#[test]
fn set_and_get_channel_roundtrip() {
    let (store, _) = store();
    store.set_channel("ch1", vec![failed("a"), failed("b")]);
    assert_eq!(ids(&store.channel("ch1")), vec!["a", "b"]);
}

#[test]
fn channels_are_isolated() {
    let (store, _) = store();
    store.set_channel("ch1", vec![failed("a")]);
    store.set_channel("ch2", vec![failed("b")]);

    store.clear_channel("ch1");

    assert!(store.channel("ch1").is_empty());
    assert_eq!(ids(&store.channel("ch2")), vec!["b"]);
}

#[test]
fn set_channel_with_empty_list_removes_channel() {
    let (store, storage) = store();
    store.set_channel("ch1", vec![failed("a")]);
    store.set_channel("ch1", vec![]);

    assert!(!store.load_all().contains_key("ch1"));
    assert_eq!(storage.get(FAILED_MESSAGES_STORAGE_KEY).unwrap().as_deref(), Some("{}"));
}

#[test]
fn add_is_idempotent_per_id() {
    let (store, _) = store();
    assert!(store.add("ch1", failed("a")));
    assert!(!store.add("ch1", failed("a")));
    assert!(store.add("ch1", failed("b")));
    assert_eq!(ids(&store.channel("ch1")), vec!["a", "b"]);
}

#[test]
fn remove_drops_single_message() {
    let (store, _) = store();
    store.set_channel("ch1", vec![failed("a"), failed("b")]);
    store.remove("ch1", "a");
    assert_eq!(ids(&store.channel("ch1")), vec!["b"]);

    store.remove("ch1", "b");
    assert!(!store.load_all().contains_key("ch1"));
}

#[test]
fn clear_all_removes_everything() {
    let (store, storage) = store();
    store.set_channel("ch1", vec![failed("a")]);
    store.set_channel("ch2", vec![failed("b")]);

    store.clear_all();

    assert!(store.load_all().is_empty());
    assert_eq!(storage.get(FAILED_MESSAGES_STORAGE_KEY).unwrap(), None);
}

#[test]
fn survives_a_new_store_instance() {
    let (store, storage) = store();
    store.add("ch1", failed("a"));

    let reopened = FailedMessageStore::new(storage, FAILED_MESSAGES_STORAGE_KEY);
    assert_eq!(ids(&reopened.channel("ch1")), vec!["a"]);
}

#[test]
fn broken_storage_is_swallowed() {
    let store = FailedMessageStore::new(Arc::new(BrokenStorage), FAILED_MESSAGES_STORAGE_KEY);
    assert!(store.add("ch1", failed("a")));
    assert!(store.channel("ch1").is_empty());
    store.clear_channel("ch1");
    store.clear_all();
}
