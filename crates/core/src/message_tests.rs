// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[test]
fn channel_message_text_joins_blocks() {
    let msg = ChannelMessage {
        id: "m1".into(),
        sender: "user".into(),
        content: vec![ContentBlock::text("hello "), ContentBlock::text("world")],
        status: MessageStatus::Sent,
    };
    assert_eq!(msg.text(), "hello world");
}

#[test]
fn channel_message_wire_shape() {
    let msg = ChannelMessage::pending("m1", "user", "hi");
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "id": "m1",
            "sender": "user",
            "content": [{ "type": "text", "text": "hi" }],
            "status": "pending",
        })
    );
}

#[test]
fn from_stored_keeps_fields() {
    let stored =
        StoredMessage { id: "h1".into(), sender: "bot".into(), content: vec![ContentBlock::text("x")] };
    let msg = ChannelMessage::from_stored(stored, MessageStatus::Sent);
    assert_eq!(msg.id, "h1");
    assert_eq!(msg.sender, "bot");
    assert_eq!(msg.status, MessageStatus::Sent);
}

#[parameterized(
    pending = { MessageStatus::Pending, "pending" },
    sent = { MessageStatus::Sent, "sent" },
    failed = { MessageStatus::Failed, "failed" },
)]
fn status_display(status: MessageStatus, expected: &str) {
    assert_eq!(status.to_string(), expected);
    assert_eq!(serde_json::to_string(&status).unwrap(), format!("\"{expected}\""));
}
