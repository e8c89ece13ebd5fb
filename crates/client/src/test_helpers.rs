// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for client tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use sl_core::{
    ClientMessage, ClockSource, ManualClock, MemoryStorage, ServerMessage, SocketError, Storage,
};

use crate::config::ManagerConfig;
use crate::manager::{ConnectionManager, ConnectionState, ManagerCallbacks, ManagerOptions};
use crate::transport::{
    EventSink, ReadyState, Transport, TransportError, TransportEvent, TransportResult,
};

/// Start of every manual clock in tests.
pub const T0: u64 = 1_700_000_000_000;

/// One recorded `connect` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectCall {
    pub url: String,
    pub protocols: Vec<String>,
}

struct MockState {
    ready: ReadyState,
    sink: Option<EventSink>,
    connects: Vec<ConnectCall>,
    sent: Vec<String>,
    disconnects: Vec<(u16, String)>,
    fail_sends: bool,
}

/// Mock transport for testing without real sockets.
///
/// Clones share state, so a test keeps one clone while the manager owns
/// another. `disconnect` behaves like a real socket and reports a close
/// event with the requested code.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                ready: ReadyState::Closed,
                sink: None,
                connects: Vec::new(),
                sent: Vec::new(),
                disconnects: Vec::new(),
                fail_sends: false,
            })),
        }
    }

    pub fn connect_calls(&self) -> Vec<ConnectCall> {
        self.state.lock().unwrap().connects.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connects.len()
    }

    /// Raw frames written so far.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Frames written so far, parsed.
    pub fn sent_messages(&self) -> Vec<ClientMessage> {
        self.sent().iter().map(|frame| ClientMessage::from_json(frame).unwrap()).collect()
    }

    /// Parsed frames, heartbeat pings excluded.
    pub fn sent_without_pings(&self) -> Vec<ClientMessage> {
        self.sent_messages()
            .into_iter()
            .filter(|m| !matches!(m, ClientMessage::Ping { .. }))
            .collect()
    }

    pub fn clear_sent(&self) {
        self.state.lock().unwrap().sent.clear();
    }

    pub fn disconnect_calls(&self) -> Vec<(u16, String)> {
        self.state.lock().unwrap().disconnects.clone()
    }

    /// Makes every subsequent `send` fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }

    fn emit(&self, event: TransportEvent) {
        let sink = self.state.lock().unwrap().sink.clone();
        if let Some(sink) = sink {
            sink.emit(event);
        }
    }

    pub fn simulate_open(&self) {
        self.state.lock().unwrap().ready = ReadyState::Open;
        self.emit(TransportEvent::Open);
    }

    pub fn simulate_close(&self, code: u16) {
        self.state.lock().unwrap().ready = ReadyState::Closed;
        self.emit(TransportEvent::Close { code, reason: String::new() });
    }

    pub fn simulate_message(&self, message: &ServerMessage) {
        self.simulate_raw(&message.to_json().unwrap());
    }

    pub fn simulate_raw(&self, data: &str) {
        self.emit(TransportEvent::Message { data: data.to_string() });
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, url: &str, protocols: &[String], sink: EventSink) {
        let mut state = self.state.lock().unwrap();
        state.connects.push(ConnectCall { url: url.to_string(), protocols: protocols.to_vec() });
        state.ready = ReadyState::Connecting;
        state.sink = Some(sink);
    }

    fn disconnect(&mut self, code: u16, reason: &str) {
        let mut state = self.state.lock().unwrap();
        state.disconnects.push((code, reason.to_string()));
        if matches!(state.ready, ReadyState::Connecting | ReadyState::Open) {
            state.ready = ReadyState::Closed;
            if let Some(sink) = &state.sink {
                sink.emit(TransportEvent::Close { code, reason: reason.to_string() });
            }
        }
    }

    fn send(&mut self, data: &str) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(TransportError::SendFailed("mock failure".into()));
        }
        if state.ready != ReadyState::Open {
            return Err(TransportError::NotOpen);
        }
        state.sent.push(data.to_string());
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().unwrap().ready
    }
}

/// Config with short, jitter-free timings.
pub fn test_config() -> ManagerConfig {
    ManagerConfig {
        url: "ws://test.local/ws".to_string(),
        token: String::new(),
        ping_interval_ms: 100,
        pong_timeout_ms: 50,
        reconnect_max_attempts: 3,
        reconnect_base_delay_ms: 100,
        reconnect_max_delay_ms: 1_000,
        reconnect_jitter_ms: 0,
        queue_max_age_ms: sl_core::QUEUE_MAX_AGE_MS,
        queue_storage_key: sl_core::QUEUE_STORAGE_KEY.to_string(),
        failed_storage_key: sl_core::FAILED_MESSAGES_STORAGE_KEY.to_string(),
    }
}

/// Everything the manager reported through its callbacks.
#[derive(Default)]
pub struct Recorded {
    pub messages: Vec<ServerMessage>,
    pub states: Vec<ConnectionState>,
    pub errors: Vec<SocketError>,
}

/// Callbacks that append to `recorded`.
pub fn recording_callbacks(recorded: &Arc<Mutex<Recorded>>) -> ManagerCallbacks {
    let messages = Arc::clone(recorded);
    let states = Arc::clone(recorded);
    let errors = Arc::clone(recorded);
    ManagerCallbacks::new()
        .on_message(move |m| messages.lock().unwrap().messages.push(m.clone()))
        .on_connection_state_change(move |s| states.lock().unwrap().states.push(s))
        .on_error(move |e| errors.lock().unwrap().errors.push(e.clone()))
}

/// A manager on a mock transport and manual clock, driven synchronously.
pub struct Harness {
    pub manager: ConnectionManager<MockTransport>,
    pub transport: MockTransport,
    pub clock: ManualClock,
    pub storage: Arc<MemoryStorage>,
    pub recorded: Arc<Mutex<Recorded>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        Self::with_storage(config, Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(config: ManagerConfig, storage: Arc<MemoryStorage>) -> Self {
        let transport = MockTransport::new();
        let clock = ManualClock::new(T0);
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let shared: Arc<dyn Storage> = storage.clone();
        let options = ManagerOptions {
            storage: shared,
            clock: Arc::new(clock.clone()),
            callbacks: recording_callbacks(&recorded),
        };
        let manager = ConnectionManager::with_transport(config, transport.clone(), options).unwrap();
        Harness { manager, transport, clock, storage, recorded }
    }

    /// Connects and completes the handshake.
    pub fn connected() -> Self {
        let mut h = Self::new();
        h.manager.connect();
        h.open();
        h
    }

    pub fn open(&mut self) {
        self.transport.simulate_open();
        self.manager.pump_events();
    }

    pub fn close(&mut self, code: u16) {
        self.transport.simulate_close(code);
        self.manager.pump_events();
    }

    pub fn receive(&mut self, message: &ServerMessage) {
        self.transport.simulate_message(message);
        self.manager.pump_events();
    }

    /// Advances the clock by `ms`, firing timers and events in deadline order.
    pub fn advance(&mut self, ms: u64) {
        let target = self.clock.now_ms() + ms;
        self.manager.pump_events();
        while let Some(at) = self.manager.next_deadline().filter(|at| *at <= target) {
            if at > self.clock.now_ms() {
                self.clock.set(at);
            }
            self.manager.poll_timers();
            self.manager.pump_events();
        }
        self.clock.set(target);
    }

    pub fn states(&self) -> Vec<ConnectionState> {
        self.recorded.lock().unwrap().states.clone()
    }

    pub fn errors(&self) -> Vec<SocketError> {
        self.recorded.lock().unwrap().errors.clone()
    }

    pub fn messages(&self) -> Vec<ServerMessage> {
        self.recorded.lock().unwrap().messages.clone()
    }
}

/// Lets spawned tasks run until `done` holds.
pub async fn settle(done: impl Fn() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    assert!(done(), "condition not reached");
}
