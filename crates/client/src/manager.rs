// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection manager: the state machine behind the client.
//!
//! Owns the transport binding and provides:
//! - Connection lifecycle (`Disconnected` / `Connecting` / `Connected` / `Reconnecting`)
//! - Heartbeat pings with a pong deadline
//! - Exponential backoff reconnection with jitter and an attempt ceiling
//! - Reference-counted subscriptions, restored after every reconnect
//! - A durable outbound queue for anything sent while offline
//! - In-flight tracking of application messages until the server echoes them
//!
//! The manager never sleeps or spawns. Timers are deadlines on the injected
//! clock: callers ask for [`ConnectionManager::next_deadline`] and call
//! [`ConnectionManager::poll_timers`] once it passes. Transport events arrive
//! through the manager's own channel and are handled by
//! [`ConnectionManager::pump_events`] or, in the runtime, by
//! [`ConnectionManager::handle_transport_event`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use sl_core::clock::rfc3339;
use sl_core::{
    codes, ClientMessage, ClockSource, ConversationDelivery, InboundMessage, MemoryStorage,
    OutboundMessage, OutboundQueue, QueuedMessage, ServerMessage, SocketError, Storage,
    SubscriptionKey, SubscriptionType,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::error::Result;
use crate::runtime::TokioClock;
use crate::transport::{
    EventSink, ReadyState, Transport, TransportEnvelope, TransportEvent, WebSocketTransport,
};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type MessageCallback = Box<dyn FnMut(&ServerMessage) + Send>;
pub type StateCallback = Box<dyn FnMut(ConnectionState) + Send>;
pub type ErrorCallback = Box<dyn FnMut(&SocketError) + Send>;
pub type SendListener = Box<dyn FnMut(&ClientMessage) + Send>;

/// Handle returned by [`ConnectionManager::add_send_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Consumer callbacks. Every one is optional.
#[derive(Default)]
pub struct ManagerCallbacks {
    pub(crate) on_message: Option<MessageCallback>,
    pub(crate) on_connection_state_change: Option<StateCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl ManagerCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every inbound frame that parses, after manager bookkeeping.
    pub fn on_message(mut self, f: impl FnMut(&ServerMessage) + Send + 'static) -> Self {
        self.on_message = Some(Box::new(f));
        self
    }

    /// Called on every state transition.
    pub fn on_connection_state_change(
        mut self,
        f: impl FnMut(ConnectionState) + Send + 'static,
    ) -> Self {
        self.on_connection_state_change = Some(Box::new(f));
        self
    }

    /// Called for server error envelopes and locally raised errors.
    pub fn on_error(mut self, f: impl FnMut(&SocketError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// Collaborators injected at construction.
pub struct ManagerOptions {
    pub storage: Arc<dyn Storage>,
    pub clock: Arc<dyn ClockSource>,
    pub callbacks: ManagerCallbacks,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        ManagerOptions {
            storage: Arc::new(MemoryStorage::new()),
            clock: Arc::new(TokioClock::new()),
            callbacks: ManagerCallbacks::default(),
        }
    }
}

/// An application message written to the socket but not yet echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InFlightMessage {
    pub id: String,
    pub message: OutboundMessage,
}

/// Point-in-time view of the manager, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerSnapshot {
    pub state: ConnectionState,
    pub reconnect_attempt: u32,
    pub ref_counts: BTreeMap<SubscriptionKey, u32>,
    pub pending_subscriptions: Vec<SubscriptionKey>,
    pub in_flight: Vec<InFlightMessage>,
    pub queue: Vec<QueuedMessage>,
}

/// Timer deadlines, in clock milliseconds.
#[derive(Debug, Default, Clone, Copy)]
struct Timers {
    ping_at: Option<u64>,
    pong_deadline: Option<u64>,
    reconnect_at: Option<u64>,
}

impl Timers {
    fn clear_heartbeat(&mut self) {
        self.ping_at = None;
        self.pong_deadline = None;
    }

    fn next(&self) -> Option<u64> {
        [self.ping_at, self.pong_deadline, self.reconnect_at].into_iter().flatten().min()
    }
}

/// Resilient pub/sub connection over a [`Transport`].
pub struct ConnectionManager<T: Transport = WebSocketTransport> {
    config: ManagerConfig,
    transport: T,
    clock: Arc<dyn ClockSource>,
    callbacks: ManagerCallbacks,
    send_listeners: Vec<(ListenerId, SendListener)>,
    next_listener_id: u64,
    queue: OutboundQueue,
    ref_counts: BTreeMap<SubscriptionKey, u32>,
    pending: BTreeSet<SubscriptionKey>,
    in_flight: Vec<InFlightMessage>,
    state: ConnectionState,
    reconnect_attempt: u32,
    timers: Timers,
    intentional_close: bool,
    disposed: bool,
    network_listening: bool,
    offline: bool,
    /// Bumped for every transport binding; events from older ones are ignored.
    generation: u64,
    events_tx: mpsc::UnboundedSender<TransportEnvelope>,
    events_rx: Option<mpsc::UnboundedReceiver<TransportEnvelope>>,
}

impl ConnectionManager<WebSocketTransport> {
    /// Create a manager with the default WebSocket transport.
    pub fn new(config: ManagerConfig, options: ManagerOptions) -> Result<Self> {
        Self::with_transport(config, WebSocketTransport::new(), options)
    }
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a manager with a custom transport.
    ///
    /// Loads the durable queue and drops entries older than
    /// `queue_max_age_ms`.
    pub fn with_transport(config: ManagerConfig, transport: T, options: ManagerOptions) -> Result<Self> {
        config.validate()?;
        let mut queue = OutboundQueue::open(
            options.storage,
            config.queue_storage_key.clone(),
            Arc::clone(&options.clock),
        );
        let pruned = queue.prune_stale(config.queue_max_age_ms);
        if pruned > 0 {
            info!("Dropped {} stale queued messages", pruned);
        }
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(ConnectionManager {
            config,
            transport,
            clock: options.clock,
            callbacks: options.callbacks,
            send_listeners: Vec::new(),
            next_listener_id: 0,
            queue,
            ref_counts: BTreeMap::new(),
            pending: BTreeSet::new(),
            in_flight: Vec::new(),
            state: ConnectionState::Disconnected,
            reconnect_attempt: 0,
            timers: Timers::default(),
            intentional_close: false,
            disposed: false,
            network_listening: false,
            offline: false,
            generation: 0,
            events_tx,
            events_rx: Some(events_rx),
        })
    }

    // --- lifecycle ---

    /// Opens the connection. No-op while connecting or connected.
    pub fn connect(&mut self) {
        self.disposed = false;
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected) {
            return;
        }
        self.intentional_close = false;
        self.offline = false;
        self.timers = Timers::default();
        self.set_state(ConnectionState::Connecting);
        self.network_listening = true;
        self.open_transport();
    }

    /// Closes the connection on purpose. No reconnect follows.
    ///
    /// In-flight messages go back to the queue so nothing is lost.
    pub fn disconnect(&mut self) {
        self.intentional_close = true;
        self.network_listening = false;
        self.detach_transport(codes::NORMAL_CLOSURE, "client disconnect");
        self.set_state(ConnectionState::Disconnected);
    }

    /// Permanent disconnect: clears subscriptions and ignores later events.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.disconnect();
        self.ref_counts.clear();
        self.pending.clear();
        self.in_flight.clear();
        info!("Connection manager disposed");
    }

    // --- subscriptions ---

    /// Adds one reference to a channel; the first one subscribes.
    pub fn subscribe(&mut self, kind: SubscriptionType, channel: &str) {
        let key = SubscriptionKey::new(kind, channel);
        let count = self.ref_counts.entry(key.clone()).or_insert(0);
        *count += 1;
        debug!("subscribe {} (refs: {})", key, count);
        if *count == 1 && !self.pending.contains(&key) {
            self.send_subscribe(&key);
        }
    }

    /// Drops one reference; the last one unsubscribes. Unknown keys are ignored.
    pub fn unsubscribe(&mut self, kind: SubscriptionType, channel: &str) {
        let key = SubscriptionKey::new(kind, channel);
        let Some(count) = self.ref_counts.get_mut(&key) else {
            return;
        };
        if *count > 1 {
            *count -= 1;
            debug!("unsubscribe {} (refs: {})", key, count);
            return;
        }
        self.ref_counts.remove(&key);
        self.pending.remove(&key);
        debug!("unsubscribe {} (last reference)", key);
        if self.state == ConnectionState::Connected {
            self.raw_send(&ClientMessage::unsubscribe(&key));
        }
    }

    // --- sending ---

    /// Sends a message, queueing it when the socket is not connected.
    ///
    /// Returns true only if the frame was written. Application messages to a
    /// channel without a subscription are rejected with a `4001` error.
    pub fn send(&mut self, message: ClientMessage) -> bool {
        if self.state != ConnectionState::Connected {
            debug!("not connected, queueing {}", message.action());
            self.queue.enqueue(message);
            return false;
        }
        if let Some(app) = message.as_application() {
            let key = app.key();
            if !self.ref_counts.contains_key(&key) {
                warn!("Rejected message to {}: not subscribed", key);
                self.emit_error(&SocketError::not_subscribed(&key));
                return false;
            }
        }
        if !self.raw_send(&message) {
            return false;
        }
        if let ClientMessage::Message(app) = message {
            self.track_in_flight(app);
        }
        true
    }

    /// Registers an observer of every frame successfully written.
    pub fn add_send_listener(&mut self, f: impl FnMut(&ClientMessage) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.send_listeners.push((id, Box::new(f)));
        id
    }

    /// Removes a send listener. Returns false if it was not registered.
    pub fn remove_send_listener(&mut self, id: ListenerId) -> bool {
        let before = self.send_listeners.len();
        self.send_listeners.retain(|(listener, _)| *listener != id);
        self.send_listeners.len() != before
    }

    // --- network signals ---

    /// Host reports the network went away.
    pub fn on_network_offline(&mut self) {
        if !self.network_listening || self.disposed {
            return;
        }
        info!("Network offline");
        self.offline = true;
        self.timers = Timers::default();
        if self.state != ConnectionState::Disconnected {
            self.set_state(ConnectionState::Reconnecting);
        }
    }

    /// Host reports the network is back.
    pub fn on_network_online(&mut self) {
        if !self.network_listening || self.disposed {
            return;
        }
        info!("Network online");
        self.offline = false;
        if self.intentional_close || self.timers.reconnect_at.is_some() {
            return;
        }
        let stalled = match self.state {
            ConnectionState::Disconnected => true,
            ConnectionState::Reconnecting => self.transport.ready_state() != ReadyState::Connecting,
            ConnectionState::Connecting | ConnectionState::Connected => false,
        };
        if !stalled {
            return;
        }
        self.reconnect_attempt = 0;
        if matches!(self.transport.ready_state(), ReadyState::Open | ReadyState::Connecting) {
            self.detach_transport(codes::NORMAL_CLOSURE, "network change");
        }
        self.schedule_reconnect();
    }

    // --- driving ---

    /// Earliest pending timer deadline, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next()
    }

    /// Fires every timer whose deadline has passed.
    pub fn poll_timers(&mut self) {
        loop {
            let now = self.clock.now_ms();
            let due = |deadline: Option<u64>| deadline.is_some_and(|at| at <= now);
            if due(self.timers.reconnect_at) {
                self.timers.reconnect_at = None;
                self.attempt_reconnect();
            } else if due(self.timers.pong_deadline) {
                self.timers.pong_deadline = None;
                self.heartbeat_timeout();
            } else if due(self.timers.ping_at) {
                self.send_ping(now);
            } else {
                break;
            }
        }
    }

    /// Handles every transport event already delivered to the manager.
    ///
    /// Returns the number handled. Does nothing once the receiver has been
    /// taken by [`take_event_receiver`](Self::take_event_receiver).
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(envelope) = self.events_rx.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.handle_transport_event(envelope);
            handled += 1;
        }
        handled
    }

    /// Hands the transport event receiver to an external driver.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<TransportEnvelope>> {
        self.events_rx.take()
    }

    /// Applies one transport event. Events from stale bindings are ignored.
    pub fn handle_transport_event(&mut self, envelope: TransportEnvelope) {
        if envelope.generation != self.generation || self.disposed {
            debug!("ignoring event from stale connection {}", envelope.generation);
            return;
        }
        match envelope.event {
            TransportEvent::Open => self.handle_open(),
            TransportEvent::Close { code, reason } => self.handle_close(code, &reason),
            TransportEvent::Message { data } => self.handle_frame(&data),
            TransportEvent::Error { message } => debug!("transport error: {}", message),
        }
    }

    // --- observability ---

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.reconnect_attempt
    }

    pub fn ref_count(&self, kind: SubscriptionType, channel: &str) -> u32 {
        self.ref_counts.get(&SubscriptionKey::new(kind, channel)).copied().unwrap_or(0)
    }

    pub fn ref_counts(&self) -> &BTreeMap<SubscriptionKey, u32> {
        &self.ref_counts
    }

    pub fn is_pending(&self, kind: SubscriptionType, channel: &str) -> bool {
        self.pending.contains(&SubscriptionKey::new(kind, channel))
    }

    pub fn in_flight(&self) -> &[InFlightMessage] {
        &self.in_flight
    }

    pub fn queued(&self) -> &[QueuedMessage] {
        self.queue.entries()
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            state: self.state,
            reconnect_attempt: self.reconnect_attempt,
            ref_counts: self.ref_counts.clone(),
            pending_subscriptions: self.pending.iter().cloned().collect(),
            in_flight: self.in_flight.clone(),
            queue: self.queue.entries().to_vec(),
        }
    }

    // --- internals ---

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        info!("Connection state: {} -> {}", self.state, state);
        self.state = state;
        if let Some(cb) = self.callbacks.on_connection_state_change.as_mut() {
            cb(state);
        }
    }

    fn emit_error(&mut self, error: &SocketError) {
        if let Some(cb) = self.callbacks.on_error.as_mut() {
            cb(error);
        }
    }

    fn open_transport(&mut self) {
        self.generation += 1;
        let sink = EventSink::new(self.generation, self.events_tx.clone());
        let protocols = self.config.token_protocols();
        info!("Connecting to {} (connection {})", self.config.url, self.generation);
        self.transport.connect(&self.config.url, &protocols, sink);
    }

    /// Closes the current binding without waiting for its close event.
    fn detach_transport(&mut self, code: u16, reason: &str) {
        self.generation += 1;
        self.transport.disconnect(code, reason);
        self.end_session();
    }

    /// Bookkeeping shared by every way a session can end.
    fn end_session(&mut self) {
        self.timers = Timers::default();
        self.pending.clear();
        self.requeue_in_flight();
    }

    fn requeue_in_flight(&mut self) {
        if self.in_flight.is_empty() {
            return;
        }
        debug!("requeueing {} in-flight messages", self.in_flight.len());
        let payloads = std::mem::take(&mut self.in_flight)
            .into_iter()
            .map(|entry| ClientMessage::Message(entry.message))
            .collect();
        self.queue.requeue_front(payloads);
    }

    fn track_in_flight(&mut self, message: OutboundMessage) {
        let id = message.id().to_string();
        self.in_flight.retain(|entry| entry.id != id);
        self.in_flight.push(InFlightMessage { id, message });
    }

    fn take_in_flight(&mut self, id: &str) -> Option<OutboundMessage> {
        let index = self.in_flight.iter().position(|entry| entry.id == id)?;
        Some(self.in_flight.remove(index).message)
    }

    fn notify_send_listeners(&mut self, message: &ClientMessage) {
        for (_, listener) in self.send_listeners.iter_mut() {
            listener(message);
        }
    }

    /// Writes one frame. Failed application messages are queued; control
    /// frames are dropped and rebuilt from the ref counts on reconnect.
    fn raw_send(&mut self, message: &ClientMessage) -> bool {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize {}: {}", message.action(), e);
                return false;
            }
        };
        match self.transport.send(&json) {
            Ok(()) => {
                debug!("sent {}", message.action());
                self.notify_send_listeners(message);
                true
            }
            Err(e) => {
                debug!("send of {} failed: {}", message.action(), e);
                if let ClientMessage::Message(_) = message {
                    self.queue.enqueue(message.clone());
                }
                false
            }
        }
    }

    fn send_subscribe(&mut self, key: &SubscriptionKey) {
        if self.state != ConnectionState::Connected {
            return;
        }
        self.pending.insert(key.clone());
        self.raw_send(&ClientMessage::subscribe(key));
    }

    fn restore_subscriptions(&mut self) {
        let keys: Vec<SubscriptionKey> = self.ref_counts.keys().cloned().collect();
        if !keys.is_empty() {
            info!("Restoring {} subscriptions", keys.len());
        }
        for key in keys {
            self.send_subscribe(&key);
        }
    }

    fn drain_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        let transport = &mut self.transport;
        let sent = self.queue.drain(|payload| match payload.to_json() {
            Ok(json) => transport.send(&json).is_ok(),
            Err(_) => false,
        });
        info!("Flushed {} queued messages ({} remaining)", sent.len(), self.queue.len());
        for entry in sent {
            self.notify_send_listeners(&entry.payload);
            if let ClientMessage::Message(app) = entry.payload {
                self.track_in_flight(app);
            }
        }
    }

    fn start_heartbeat(&mut self) {
        self.timers.clear_heartbeat();
        if self.config.ping_interval_ms > 0 {
            self.timers.ping_at = Some(self.clock.now_ms() + self.config.ping_interval_ms);
        }
    }

    fn send_ping(&mut self, now: u64) {
        self.timers.ping_at = Some(now + self.config.ping_interval_ms);
        if self.timers.pong_deadline.is_none() {
            self.timers.pong_deadline = Some(now + self.config.pong_timeout_ms);
        }
        self.raw_send(&ClientMessage::ping(rfc3339(now)));
    }

    fn heartbeat_timeout(&mut self) {
        warn!("No pong within {}ms, closing connection", self.config.pong_timeout_ms);
        self.timers.clear_heartbeat();
        self.transport.disconnect(codes::HEARTBEAT_TIMEOUT, "pong timeout");
    }

    fn reconnect_delay(&self) -> u64 {
        let factor = 1u64.checked_shl(self.reconnect_attempt).unwrap_or(u64::MAX);
        let jitter = match self.config.reconnect_jitter_ms {
            0 => 0,
            bound => rand::rng().random_range(0..bound),
        };
        self.config
            .reconnect_base_delay_ms
            .saturating_mul(factor)
            .saturating_add(jitter)
            .min(self.config.reconnect_max_delay_ms)
    }

    fn schedule_reconnect(&mut self) {
        if self.disposed {
            return;
        }
        if self.reconnect_attempt >= self.config.reconnect_max_attempts {
            warn!("Giving up after {} reconnection attempts", self.reconnect_attempt);
            self.set_state(ConnectionState::Disconnected);
            self.emit_error(&SocketError::max_reconnect_attempts());
            return;
        }
        self.set_state(ConnectionState::Reconnecting);
        let delay = self.reconnect_delay();
        self.reconnect_attempt += 1;
        info!("Reconnecting in {}ms (attempt {})", delay, self.reconnect_attempt);
        self.timers.reconnect_at = Some(self.clock.now_ms() + delay);
    }

    fn attempt_reconnect(&mut self) {
        if self.disposed || self.intentional_close {
            return;
        }
        self.open_transport();
    }

    fn handle_open(&mut self) {
        info!("Connected to {}", self.config.url);
        self.reconnect_attempt = 0;
        self.set_state(ConnectionState::Connected);
        self.start_heartbeat();
        self.restore_subscriptions();
        self.drain_queue();
    }

    fn handle_close(&mut self, code: u16, reason: &str) {
        info!("Connection closed (code {}, reason {:?})", code, reason);
        self.end_session();
        if self.intentional_close || self.disposed {
            self.set_state(ConnectionState::Disconnected);
        } else if self.offline {
            self.set_state(ConnectionState::Reconnecting);
        } else if code == codes::NORMAL_CLOSURE {
            self.set_state(ConnectionState::Disconnected);
        } else {
            self.schedule_reconnect();
        }
    }

    fn handle_frame(&mut self, data: &str) {
        let message = match ServerMessage::from_json(data) {
            Ok(message) => message,
            Err(e) => {
                debug!("dropping unparseable frame: {}", e);
                return;
            }
        };

        match &message {
            ServerMessage::Pong { .. } => {
                self.timers.pong_deadline = None;
                return;
            }
            ServerMessage::SubscribeAck(channel) => {
                self.pending.remove(&channel.key());
            }
            ServerMessage::Message(InboundMessage::Conversation(ConversationDelivery::Event {
                id,
                channel,
                ..
            })) => {
                let was_in_flight = self.take_in_flight(id).is_some();
                if was_in_flight || self.queue.contains_message(id) {
                    let removed = self
                        .queue
                        .remove_by_channel_and_type(channel, SubscriptionType::Conversation);
                    debug!("confirmed {} on {} ({} queued entries dropped)", id, channel, removed);
                }
            }
            ServerMessage::Message(InboundMessage::Conversation(ConversationDelivery::Error {
                message_id: Some(id),
                ..
            })) => {
                self.take_in_flight(id);
            }
            ServerMessage::Error(error) => {
                if let Some(original) = error.message_id.as_deref().and_then(|id| self.take_in_flight(id)) {
                    debug!("requeueing rejected message {}", original.id());
                    self.queue.enqueue(ClientMessage::Message(original));
                }
                self.emit_error(error);
            }
            _ => {}
        }

        if let Some(cb) = self.callbacks.on_message.as_mut() {
            cb(&message);
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
