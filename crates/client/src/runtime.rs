// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Async runtime for the connection manager.
//!
//! [`spawn_manager`] moves a [`ConnectionManager`] into a tokio task that
//! owns it exclusively. The task multiplexes three inputs:
//! - commands from [`ManagerHandle`]s
//! - transport events
//! - the manager's next timer deadline
//!
//! The task stops, disposing the manager, once every handle is dropped.

use std::time::Duration;

use sl_core::{ClientMessage, ClockSource, SubscriptionKey, SubscriptionType, SystemClock};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::manager::{
    ConnectionManager, ConnectionState, InFlightMessage, ListenerId, ManagerSnapshot, SendListener,
};
use crate::transport::Transport;

/// Clock that follows tokio's timer.
///
/// Reads wall-clock time once at creation and advances with
/// [`tokio::time::Instant`], so paused-time tests see timers fire in order.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin_ms: u64,
    start: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        TokioClock { origin_ms: SystemClock.now_ms(), start: Instant::now() }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for TokioClock {
    fn now_ms(&self) -> u64 {
        self.origin_ms + self.start.elapsed().as_millis() as u64
    }
}

enum Command {
    Connect,
    Disconnect,
    Dispose,
    Subscribe(SubscriptionType, String),
    Unsubscribe(SubscriptionType, String),
    Send(ClientMessage, oneshot::Sender<bool>),
    NetworkOnline,
    NetworkOffline,
    AddSendListener(SendListener, oneshot::Sender<ListenerId>),
    RemoveSendListener(ListenerId),
    Snapshot(oneshot::Sender<ManagerSnapshot>),
}

/// Cloneable handle to a running connection manager.
#[derive(Clone)]
pub struct ManagerHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

/// Starts the manager task. Must be called from within a tokio runtime.
pub fn spawn_manager<T>(mut manager: ConnectionManager<T>) -> ManagerHandle
where
    T: Transport + 'static,
{
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(manager.state());
    match manager.take_event_receiver() {
        Some(events) => {
            tokio::spawn(run(manager, commands_rx, events, state_tx));
        }
        None => warn!("Connection manager event receiver already taken; not starting"),
    }
    ManagerHandle { commands: commands_tx, state: state_rx }
}

async fn run<T: Transport>(
    mut manager: ConnectionManager<T>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::UnboundedReceiver<crate::transport::TransportEnvelope>,
    state_tx: watch::Sender<ConnectionState>,
) {
    loop {
        let wait = manager.next_deadline().map(|at| at.saturating_sub(manager.now_ms()));
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => apply(&mut manager, command),
                None => break,
            },
            Some(envelope) = events.recv() => manager.handle_transport_event(envelope),
            () = sleep_for(wait) => manager.poll_timers(),
        }
        publish_state(&state_tx, manager.state());
    }
    debug!("all manager handles dropped, shutting down");
    manager.dispose();
    publish_state(&state_tx, manager.state());
}

async fn sleep_for(wait: Option<u64>) {
    match wait {
        Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        None => std::future::pending().await,
    }
}

fn publish_state(tx: &watch::Sender<ConnectionState>, state: ConnectionState) {
    tx.send_if_modified(|current| {
        if *current == state {
            return false;
        }
        *current = state;
        true
    });
}

fn apply<T: Transport>(manager: &mut ConnectionManager<T>, command: Command) {
    match command {
        Command::Connect => manager.connect(),
        Command::Disconnect => manager.disconnect(),
        Command::Dispose => manager.dispose(),
        Command::Subscribe(kind, channel) => manager.subscribe(kind, &channel),
        Command::Unsubscribe(kind, channel) => manager.unsubscribe(kind, &channel),
        Command::Send(message, reply) => {
            let _ = reply.send(manager.send(message));
        }
        Command::NetworkOnline => manager.on_network_online(),
        Command::NetworkOffline => manager.on_network_offline(),
        Command::AddSendListener(listener, reply) => {
            let _ = reply.send(manager.add_send_listener(listener));
        }
        Command::RemoveSendListener(id) => {
            manager.remove_send_listener(id);
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(manager.snapshot());
        }
    }
}

impl ManagerHandle {
    fn command(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::ManagerGone)
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        self.command(make(tx))?;
        rx.await.map_err(|_| Error::ManagerGone)
    }

    pub fn connect(&self) -> Result<()> {
        self.command(Command::Connect)
    }

    pub fn disconnect(&self) -> Result<()> {
        self.command(Command::Disconnect)
    }

    pub fn dispose(&self) -> Result<()> {
        self.command(Command::Dispose)
    }

    pub fn subscribe(&self, kind: SubscriptionType, channel: &str) -> Result<()> {
        self.command(Command::Subscribe(kind, channel.to_string()))
    }

    pub fn unsubscribe(&self, kind: SubscriptionType, channel: &str) -> Result<()> {
        self.command(Command::Unsubscribe(kind, channel.to_string()))
    }

    /// Sends a message; resolves to whether the frame was written.
    pub async fn send(&self, message: ClientMessage) -> Result<bool> {
        self.request(|reply| Command::Send(message, reply)).await
    }

    pub fn network_online(&self) -> Result<()> {
        self.command(Command::NetworkOnline)
    }

    pub fn network_offline(&self) -> Result<()> {
        self.command(Command::NetworkOffline)
    }

    pub async fn add_send_listener(
        &self,
        f: impl FnMut(&ClientMessage) + Send + 'static,
    ) -> Result<ListenerId> {
        let listener: SendListener = Box::new(f);
        self.request(|reply| Command::AddSendListener(listener, reply)).await
    }

    pub fn remove_send_listener(&self, id: ListenerId) -> Result<()> {
        self.command(Command::RemoveSendListener(id))
    }

    pub async fn snapshot(&self) -> Result<ManagerSnapshot> {
        self.request(Command::Snapshot).await
    }

    /// Last published connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub async fn queue_len(&self) -> Result<usize> {
        Ok(self.snapshot().await?.queue.len())
    }

    pub async fn ref_count(&self, kind: SubscriptionType, channel: &str) -> Result<u32> {
        let key = SubscriptionKey::new(kind, channel);
        Ok(self.snapshot().await?.ref_counts.get(&key).copied().unwrap_or(0))
    }

    pub async fn pending_subscriptions(&self) -> Result<Vec<SubscriptionKey>> {
        Ok(self.snapshot().await?.pending_subscriptions)
    }

    pub async fn in_flight(&self) -> Result<Vec<InFlightMessage>> {
        Ok(self.snapshot().await?.in_flight)
    }

    /// Receiver that observes every published state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits until the manager reaches `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<()> {
        let mut rx = self.state.clone();
        rx.wait_for(|state| *state == target).await.map(|_| ()).map_err(|_| Error::ManagerGone)
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
