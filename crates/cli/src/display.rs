// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Line formatting for everything the CLI prints.

use sl_client::{ConnectionState, ConnectionStatus};
use sl_core::{
    ChannelMessage, ChannelNotification, ContentBlock, ConversationDelivery, InboundMessage,
    MessageStatus, NotificationDelivery, ServerMessage, SocketError,
};

use crate::colors::Palette;

fn content_text(content: &[ContentBlock]) -> String {
    content.iter().map(ContentBlock::as_text).collect()
}

/// `sender: text`, suffixed with the delivery status unless sent.
pub fn format_message(p: &Palette, message: &ChannelMessage) -> String {
    let line = format!("{}: {}", p.channel(&message.sender), message.text());
    match message.status {
        MessageStatus::Sent => line,
        MessageStatus::Pending => format!("{} {}", line, p.context("(sending)")),
        MessageStatus::Failed => format!("{} {}", line, p.failure("(failed)")),
    }
}

pub fn format_notification(p: &Palette, channel: &str, notification: &ChannelNotification) -> String {
    format!(
        "{} {}: {} {}",
        p.channel(&format!("[{channel}]")),
        notification.title,
        notification.body,
        p.context(&notification.timestamp)
    )
}

pub fn format_state(p: &Palette, state: ConnectionState) -> String {
    p.state(&format!("* {state}"))
}

pub fn format_error(p: &Palette, error: &SocketError) -> String {
    p.failure(&format!("error {}: {}", error.code, error.message))
}

/// Banner text, or `None` when the banner is hidden.
pub fn format_status(p: &Palette, status: &ConnectionStatus) -> Option<String> {
    match status {
        ConnectionStatus::Hidden => None,
        ConnectionStatus::Visible { state, message } => {
            Some(p.state(&format!("* {message} ({state})")))
        }
    }
}

/// Lines for one inbound frame, as shown by `listen`. Pongs print nothing.
pub fn format_server_message(p: &Palette, message: &ServerMessage) -> Vec<String> {
    match message {
        ServerMessage::Pong { .. } => Vec::new(),
        ServerMessage::SubscribeAck(target) => {
            vec![p.context(&format!("subscribed to {}", target.key()))]
        }
        ServerMessage::UnsubscribeAck(target) => {
            vec![p.context(&format!("unsubscribed from {}", target.key()))]
        }
        ServerMessage::Error(error) => vec![format_error(p, error)],
        ServerMessage::Message(InboundMessage::Conversation(delivery)) => {
            format_conversation(p, delivery)
        }
        ServerMessage::Message(InboundMessage::Notification(delivery)) => match delivery {
            NotificationDelivery::Event { id, channel, title, body, timestamp } => {
                let notification = ChannelNotification {
                    id: id.clone(),
                    title: title.clone(),
                    body: body.clone(),
                    timestamp: timestamp.clone(),
                };
                vec![format_notification(p, channel, &notification)]
            }
            NotificationDelivery::Dump { channel, notifications } => notifications
                .iter()
                .map(|n| format_notification(p, channel, n))
                .collect(),
        },
    }
}

fn format_conversation(p: &Palette, delivery: &ConversationDelivery) -> Vec<String> {
    match delivery {
        ConversationDelivery::Event { channel, sender, content, .. } => {
            vec![format!("{} {}: {}", p.channel(&format!("#{channel}")), sender, content_text(content))]
        }
        ConversationDelivery::Dump { channel, messages } => {
            let tag = p.channel(&format!("#{channel}"));
            let mut lines = vec![p.context(&format!("#{channel} history ({} messages)", messages.len()))];
            lines.extend(
                messages
                    .iter()
                    .map(|m| format!("{} {}: {}", tag, m.sender, content_text(&m.content))),
            );
            lines
        }
        ConversationDelivery::Error { channel, message, message_id, .. } => {
            let target = match message_id {
                Some(id) => format!("#{channel} rejected {id}"),
                None => format!("#{channel} rejected"),
            };
            vec![p.failure(&format!("{target}: {message}"))]
        }
    }
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
