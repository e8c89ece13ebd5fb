// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for WebSocket communication.
//!
//! A transport is a callback-style socket: `connect` starts a connection
//! attempt and reports its lifecycle through an [`EventSink`] (open, close,
//! text frames, errors). Failures to connect are reported as a close event,
//! never as a return value. This lets the connection manager stay a plain
//! synchronous state machine and lets tests drive it with a mock transport.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use sl_core::codes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Close code reported when the peer closed without a status.
const NO_STATUS_RECEIVED: u16 = 1005;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The socket is not in the open state.
    #[error("socket is not open")]
    NotOpen,

    /// The socket task has gone away.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Socket ready state, mirroring the WebSocket readyState values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ReadyState::Connecting => 0,
            ReadyState::Open => 1,
            ReadyState::Closing => 2,
            ReadyState::Closed => 3,
        }
    }
}

/// Lifecycle event reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Close { code: u16, reason: String },
    Message { data: String },
    /// Socket-level error. Always followed by a `Close`.
    Error { message: String },
}

/// An event tagged with the connection generation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEnvelope {
    pub generation: u64,
    pub event: TransportEvent,
}

/// Where a transport reports events for one connection attempt.
///
/// Each attempt gets a sink with a fresh generation, so events from an
/// abandoned socket can be told apart from the current one.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TransportEnvelope>,
}

impl EventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TransportEnvelope>) -> Self {
        EventSink { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reports an event. Returns false once the receiving side is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send(TransportEnvelope { generation: self.generation, event }).is_ok()
    }
}

/// Transport trait for WebSocket-like communication.
pub trait Transport: Send {
    /// Starts a connection attempt; outcome arrives through `sink`.
    fn connect(&mut self, url: &str, protocols: &[String], sink: EventSink);

    /// Closes the socket with `code` and `reason`.
    fn disconnect(&mut self, code: u16, reason: &str);

    /// Writes one text frame.
    fn send(&mut self, data: &str) -> TransportResult<()>;

    fn ready_state(&self) -> ReadyState;
}

enum Outgoing {
    Text(String),
    Close { code: u16, reason: String },
}

/// WebSocket transport implementation using tokio-tungstenite.
///
/// Each connection attempt runs in its own task. Must be used from within a
/// tokio runtime; outside one, `connect` reports an immediate failure.
pub struct WebSocketTransport {
    state: Arc<AtomicU8>,
    outgoing: Option<mpsc::UnboundedSender<Outgoing>>,
    task: Option<JoinHandle<()>>,
    sink: Option<EventSink>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        WebSocketTransport {
            state: Arc::new(AtomicU8::new(ReadyState::Closed.as_u8())),
            outgoing: None,
            task: None,
            sink: None,
        }
    }

    fn set_state(&self, state: ReadyState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.outgoing = None;
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.abort_task();
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str, protocols: &[String], sink: EventSink) {
        self.abort_task();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.set_state(ReadyState::Closed);
                sink.emit(TransportEvent::Error { message: e.to_string() });
                sink.emit(TransportEvent::Close {
                    code: codes::ABNORMAL_CLOSURE,
                    reason: String::new(),
                });
                return;
            }
        };

        let state = Arc::new(AtomicU8::new(ReadyState::Connecting.as_u8()));
        let (tx, rx) = mpsc::unbounded_channel();
        self.state = Arc::clone(&state);
        self.outgoing = Some(tx);
        self.sink = Some(sink.clone());
        self.task = Some(runtime.spawn(run_socket(
            url.to_string(),
            protocols.to_vec(),
            sink,
            rx,
            state,
        )));
    }

    fn disconnect(&mut self, code: u16, reason: &str) {
        match self.ready_state() {
            ReadyState::Connecting => {
                self.abort_task();
                self.set_state(ReadyState::Closed);
                if let Some(sink) = &self.sink {
                    sink.emit(TransportEvent::Close { code, reason: reason.to_string() });
                }
            }
            ReadyState::Open => {
                self.set_state(ReadyState::Closing);
                let sent = self.outgoing.as_ref().is_some_and(|tx| {
                    tx.send(Outgoing::Close { code, reason: reason.to_string() }).is_ok()
                });
                if !sent {
                    self.set_state(ReadyState::Closed);
                }
            }
            ReadyState::Closing | ReadyState::Closed => {}
        }
    }

    fn send(&mut self, data: &str) -> TransportResult<()> {
        if self.ready_state() != ReadyState::Open {
            return Err(TransportError::NotOpen);
        }
        let tx = self.outgoing.as_ref().ok_or(TransportError::ConnectionClosed)?;
        tx.send(Outgoing::Text(data.to_string()))
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

async fn run_socket(
    url: String,
    protocols: Vec<String>,
    sink: EventSink,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    state: Arc<AtomicU8>,
) {
    let (code, reason) = match open_socket(&url, &protocols).await {
        Ok(ws) => {
            state.store(ReadyState::Open.as_u8(), Ordering::SeqCst);
            sink.emit(TransportEvent::Open);
            pump(ws, &sink, &mut outgoing).await
        }
        Err(message) => {
            warn!("Connection to {} failed: {}", url, message);
            sink.emit(TransportEvent::Error { message });
            (codes::ABNORMAL_CLOSURE, String::new())
        }
    };
    state.store(ReadyState::Closed.as_u8(), Ordering::SeqCst);
    sink.emit(TransportEvent::Close { code, reason });
}

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn open_socket(url: &str, protocols: &[String]) -> Result<Socket, String> {
    let mut request = url.into_client_request().map_err(|e| e.to_string())?;
    if !protocols.is_empty() {
        let value = HeaderValue::from_str(&protocols.join(", ")).map_err(|e| e.to_string())?;
        request.headers_mut().insert("Sec-WebSocket-Protocol", value);
    }
    let (ws, _) = tokio_tungstenite::connect_async(request).await.map_err(|e| e.to_string())?;
    Ok(ws)
}

/// Shuttles frames until either side closes. Returns the close code and reason.
async fn pump(
    ws: Socket,
    sink: &EventSink,
    outgoing: &mut mpsc::UnboundedReceiver<Outgoing>,
) -> (u16, String) {
    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            command = outgoing.recv() => match command {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        sink.emit(TransportEvent::Error { message: e.to_string() });
                        return (codes::ABNORMAL_CLOSURE, String::new());
                    }
                }
                Some(Outgoing::Close { code, reason }) => {
                    let frame = CloseFrame { code: CloseCode::from(code), reason: reason.clone().into() };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        debug!("close frame not delivered: {}", e);
                    }
                    return (code, reason);
                }
                None => return (codes::NORMAL_CLOSURE, String::new()),
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    sink.emit(TransportEvent::Message { data: text.to_string() });
                }
                Some(Ok(Message::Close(frame))) => {
                    return frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((NO_STATUS_RECEIVED, String::new()));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    sink.emit(TransportEvent::Error { message: e.to_string() });
                    return (codes::ABNORMAL_CLOSURE, String::new());
                }
                None => return (codes::ABNORMAL_CLOSURE, String::new()),
            },
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
