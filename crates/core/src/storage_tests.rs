// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the storage module.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::test_helpers::BrokenStorage;
use tempfile::tempdir;

#[test]
fn memory_storage_get_set_remove() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.get("k").unwrap(), None);

    storage.set("k", "v1").unwrap();
    storage.set("k", "v2").unwrap();
    assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));

    storage.remove("k").unwrap();
    storage.remove("k").unwrap();
    assert_eq!(storage.get("k").unwrap(), None);
}

#[test]
fn file_storage_roundtrip() {
    let dir = tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();

    storage.set("ws_outgoing_queue", "[1,2,3]").unwrap();
    assert_eq!(storage.get("ws_outgoing_queue").unwrap().as_deref(), Some("[1,2,3]"));
    assert!(dir.path().join("ws_outgoing_queue.json").exists());
    assert!(!dir.path().join("ws_outgoing_queue.json.tmp").exists());

    storage.remove("ws_outgoing_queue").unwrap();
    assert_eq!(storage.get("ws_outgoing_queue").unwrap(), None);
}

#[test]
fn file_storage_survives_reopen() {
    let dir = tempdir().unwrap();
    FileStorage::open(dir.path()).unwrap().set("key", "value").unwrap();

    let reopened = FileStorage::open(dir.path()).unwrap();
    assert_eq!(reopened.get("key").unwrap().as_deref(), Some("value"));
}

#[test]
fn file_storage_creates_missing_dir() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a/b/c");
    let storage = FileStorage::open(&nested).unwrap();
    assert_eq!(storage.dir(), nested.as_path());
    assert!(nested.is_dir());
}

#[test]
fn file_storage_sanitizes_keys() {
    let dir = tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();
    storage.set("../escape/key", "x").unwrap();
    assert!(dir.path().join("%2E%2E%2Fescape%2Fkey.json").exists());
    assert_eq!(storage.get("../escape/key").unwrap().as_deref(), Some("x"));
}

#[test]
fn file_storage_keeps_similar_keys_apart() {
    let dir = tempdir().unwrap();
    let storage = FileStorage::open(dir.path()).unwrap();
    storage.set("a.b", "dot").unwrap();
    storage.set("a_b", "underscore").unwrap();
    storage.set("a%2Eb", "literal").unwrap();
    assert_eq!(storage.get("a.b").unwrap().as_deref(), Some("dot"));
    assert_eq!(storage.get("a_b").unwrap().as_deref(), Some("underscore"));
    assert_eq!(storage.get("a%2Eb").unwrap().as_deref(), Some("literal"));

    storage.remove("a.b").unwrap();
    assert_eq!(storage.get("a.b").unwrap(), None);
    assert_eq!(storage.get("a_b").unwrap().as_deref(), Some("underscore"));
}

#[test]
fn best_effort_helpers_swallow_failures() {
    let storage = BrokenStorage;
    assert_eq!(read_or_empty(&storage, "k"), None);
    write_best_effort(&storage, "k", "v");
    remove_best_effort(&storage, "k");
}
