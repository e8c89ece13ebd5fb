// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sl_core::{ClientMessage, MemoryStorage, SubscriptionKey, SubscriptionType};

use super::*;
use crate::manager::{ConnectionManager, ManagerOptions};
use crate::test_helpers::{recording_callbacks, settle, test_config, MockTransport, Recorded};

fn spawn_mock() -> (ManagerHandle, MockTransport, Arc<Mutex<Recorded>>) {
    let transport = MockTransport::new();
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let options = ManagerOptions {
        storage: Arc::new(MemoryStorage::new()),
        clock: Arc::new(TokioClock::new()),
        callbacks: recording_callbacks(&recorded),
    };
    let manager = ConnectionManager::with_transport(test_config(), transport.clone(), options).unwrap();
    (spawn_manager(manager), transport, recorded)
}

async fn connected() -> (ManagerHandle, MockTransport, Arc<Mutex<Recorded>>) {
    let (handle, transport, recorded) = spawn_mock();
    handle.connect().unwrap();
    settle(|| transport.connect_count() == 1).await;
    transport.simulate_open();
    handle.wait_for_state(ConnectionState::Connected).await.unwrap();
    (handle, transport, recorded)
}

#[tokio::test(start_paused = true)]
async fn tokio_clock_follows_paused_time() {
    let clock = TokioClock::new();
    let start = clock.now_ms();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(clock.now_ms() - start, 250);
}

#[tokio::test(start_paused = true)]
async fn connects_and_publishes_state() {
    let (handle, _transport, recorded) = connected().await;
    assert_eq!(handle.connection_state(), ConnectionState::Connected);
    assert_eq!(
        recorded.lock().unwrap().states,
        vec![ConnectionState::Connecting, ConnectionState::Connected]
    );
}

#[tokio::test(start_paused = true)]
async fn send_reports_whether_frame_was_written() {
    let (handle, transport, _recorded) = connected().await;
    handle.subscribe(SubscriptionType::Conversation, "general").unwrap();
    assert!(handle.send(ClientMessage::conversation("m1", "general", "hi")).await.unwrap());
    assert!(!handle.send(ClientMessage::conversation("m2", "random", "hi")).await.unwrap());

    let in_flight = handle.in_flight().await.unwrap();
    assert_eq!(in_flight.len(), 1);
    assert_eq!(in_flight[0].id, "m1");
    assert_eq!(handle.ref_count(SubscriptionType::Conversation, "general").await.unwrap(), 1);
    assert_eq!(
        handle.pending_subscriptions().await.unwrap(),
        vec![SubscriptionKey::conversation("general")]
    );
    assert_eq!(handle.queue_len().await.unwrap(), 0);
    assert_eq!(transport.sent_without_pings().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_timeout_triggers_reconnect() {
    let (handle, transport, _recorded) = connected().await;

    tokio::time::sleep(Duration::from_millis(160)).await;
    handle.wait_for_state(ConnectionState::Reconnecting).await.unwrap();
    assert_eq!(transport.disconnect_calls(), vec![(4000, "pong timeout".to_string())]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    settle(|| transport.connect_count() == 2).await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_restores_subscriptions() {
    let (handle, transport, _recorded) = connected().await;
    handle.subscribe(SubscriptionType::Notification, "alerts").unwrap();
    settle(|| transport.sent_without_pings().len() == 1).await;

    transport.simulate_close(1006);
    handle.wait_for_state(ConnectionState::Reconnecting).await.unwrap();
    transport.clear_sent();

    tokio::time::sleep(Duration::from_millis(100)).await;
    settle(|| transport.connect_count() == 2).await;
    transport.simulate_open();
    handle.wait_for_state(ConnectionState::Connected).await.unwrap();
    settle(|| !transport.sent_without_pings().is_empty()).await;
    assert_eq!(
        transport.sent_without_pings(),
        vec![ClientMessage::subscribe(&SubscriptionKey::notification("alerts"))]
    );
}

#[tokio::test(start_paused = true)]
async fn send_listener_registered_through_handle() {
    let (handle, _transport, _recorded) = connected().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = handle
        .add_send_listener(move |m| sink.lock().unwrap().push(m.action()))
        .await
        .unwrap();

    handle.subscribe(SubscriptionType::Conversation, "general").unwrap();
    handle.snapshot().await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["subscribe"]);

    handle.remove_send_listener(id).unwrap();
    handle.unsubscribe(SubscriptionType::Conversation, "general").unwrap();
    handle.snapshot().await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_through_handle() {
    let (handle, transport, _recorded) = connected().await;
    handle.disconnect().unwrap();
    handle.wait_for_state(ConnectionState::Disconnected).await.unwrap();
    assert_eq!(transport.disconnect_calls(), vec![(1000, "client disconnect".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_stops_the_task() {
    let (handle, transport, _recorded) = connected().await;
    let watcher = handle.watch_state();
    drop(handle);

    let mut watcher = watcher;
    watcher.wait_for(|s| *s == ConnectionState::Disconnected).await.unwrap();
    assert_eq!(transport.disconnect_calls(), vec![(1000, "client disconnect".to_string())]);
}
