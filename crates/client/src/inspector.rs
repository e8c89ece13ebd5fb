// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostics: store history, state diffs and an outbound message log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use sl_core::{ClientMessage, ClockSource};
use tracing::warn;

use crate::store::{lock, MessageStore, StoreState};

/// Snapshots kept before the oldest is dropped.
pub const DEFAULT_MAX_HISTORY: usize = 500;

/// Action name of the snapshot taken when recording starts.
pub const INIT_ACTION: &str = "@@INIT";

/// Store state after one mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub id: u64,
    pub timestamp: u64,
    pub action_name: String,
    pub state: Value,
}

/// Bounded history of store states.
pub struct StateRecorder {
    history: VecDeque<StateSnapshot>,
    max_history: usize,
    next_id: u64,
    enabled: bool,
    clock: Arc<dyn ClockSource>,
}

impl StateRecorder {
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        Self::with_max_history(clock, DEFAULT_MAX_HISTORY)
    }

    pub fn with_max_history(clock: Arc<dyn ClockSource>, max_history: usize) -> Self {
        StateRecorder {
            history: VecDeque::new(),
            max_history: max_history.max(1),
            next_id: 0,
            enabled: true,
            clock,
        }
    }

    /// Records `@@INIT` and every later store mutation.
    pub fn attach(recorder: &Arc<Mutex<StateRecorder>>, store: &mut MessageStore) {
        lock(recorder).record(INIT_ACTION, store.state());
        let recorder = Arc::clone(recorder);
        store.add_change_listener(move |action, state| lock(&recorder).record(action.name(), state));
    }

    pub fn record(&mut self, action_name: &str, state: &StoreState) {
        if !self.enabled {
            return;
        }
        let state = match serde_json::to_value(state) {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to capture store state: {}", e);
                return;
            }
        };
        if self.history.len() >= self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(StateSnapshot {
            id: self.next_id,
            timestamp: self.clock.now_ms(),
            action_name: action_name.to_string(),
            state,
        });
        self.next_id += 1;
    }

    pub fn history(&self) -> &VecDeque<StateSnapshot> {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Changes between the snapshot at `index` and the one before it.
    pub fn diff_at(&self, index: usize) -> Vec<DiffEntry> {
        match (index.checked_sub(1).and_then(|i| self.history.get(i)), self.history.get(index)) {
            (Some(prev), Some(next)) => compute_diff(&prev.state, &next.state),
            _ => Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Disabling stops recording and drops the history.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.history.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

/// One difference between two states, addressed by a dotted path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub path: String,
    pub kind: DiffKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// Structural diff of two JSON values. Objects are compared key by key;
/// arrays and scalars are compared whole.
pub fn compute_diff(prev: &Value, next: &Value) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    diff_into(prev, next, String::new(), &mut entries);
    entries
}

fn diff_into(a: &Value, b: &Value, path: String, entries: &mut Vec<DiffEntry>) {
    if a == b {
        return;
    }
    match (a, b) {
        (Value::Null, _) => entries.push(DiffEntry {
            path,
            kind: DiffKind::Added,
            old_value: None,
            new_value: Some(b.clone()),
        }),
        (_, Value::Null) => entries.push(DiffEntry {
            path,
            kind: DiffKind::Removed,
            old_value: Some(a.clone()),
            new_value: None,
        }),
        (Value::Object(a_map), Value::Object(b_map)) => {
            let child = |key: &str| if path.is_empty() { key.to_string() } else { format!("{path}.{key}") };
            for (key, old) in a_map {
                match b_map.get(key) {
                    Some(new) => diff_into(old, new, child(key), entries),
                    None => entries.push(DiffEntry {
                        path: child(key),
                        kind: DiffKind::Removed,
                        old_value: Some(old.clone()),
                        new_value: None,
                    }),
                }
            }
            for (key, new) in b_map.iter().filter(|(key, _)| !a_map.contains_key(*key)) {
                entries.push(DiffEntry {
                    path: child(key),
                    kind: DiffKind::Added,
                    old_value: None,
                    new_value: Some(new.clone()),
                });
            }
        }
        _ => entries.push(DiffEntry {
            path,
            kind: DiffKind::Changed,
            old_value: Some(a.clone()),
            new_value: Some(b.clone()),
        }),
    }
}

/// One frame written to the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEntry {
    pub id: u64,
    pub timestamp: u64,
    pub message: ClientMessage,
}

/// Bounded log of outbound frames, fed by a manager send listener.
pub struct OutgoingLog {
    entries: VecDeque<OutgoingEntry>,
    max_entries: usize,
    next_id: u64,
    clock: Arc<dyn ClockSource>,
}

impl OutgoingLog {
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        OutgoingLog {
            entries: VecDeque::new(),
            max_entries: DEFAULT_MAX_HISTORY,
            next_id: 0,
            clock,
        }
    }

    pub fn push(&mut self, message: &ClientMessage) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(OutgoingEntry {
            id: self.next_id,
            timestamp: self.clock.now_ms(),
            message: message.clone(),
        });
        self.next_id += 1;
    }

    pub fn entries(&self) -> &VecDeque<OutgoingEntry> {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Send listener that appends to `log`.
    pub fn listener(log: &Arc<Mutex<OutgoingLog>>) -> impl FnMut(&ClientMessage) + Send + 'static {
        let log = Arc::clone(log);
        move |message| lock(&log).push(message)
    }
}

#[cfg(test)]
#[path = "inspector_tests.rs"]
mod tests;
