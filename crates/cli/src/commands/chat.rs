// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use sl_client::hooks::LOCAL_SENDER;
use sl_client::ConnectionStatusTracker;
use sl_core::{ConversationDelivery, InboundMessage, ServerMessage};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::Context;
use crate::colors::Palette;
use crate::display::{format_server_message, format_status};
use crate::error::Result;

/// Chats on `channel`: history and new messages are printed, each stdin
/// line is sent. Ends on `/quit`, end of input, or Ctrl-C.
pub async fn run(ctx: &Context, channel: &str) -> Result<()> {
    let palette = ctx.palette;
    let watched = channel.to_string();
    let callbacks = ctx
        .status_callbacks()
        .on_message(move |message| print_incoming(&palette, &watched, message));
    let client = ctx.start_client(callbacks)?;
    let subscription = client.conversation(channel);
    client.connect()?;

    let mut tracker = ConnectionStatusTracker::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        match line.trim() {
            "" => {}
            "/quit" => break,
            "/retry" => {
                let resent = subscription.retry_all().await?;
                println!("{}", palette.context(&format!("resent {resent} message(s)")));
            }
            "/status" => {
                let status = tracker.observe(&client.state());
                let line = format_status(&palette, &status)
                    .unwrap_or_else(|| palette.state(&format!("* {}", subscription.connection_state())));
                println!("{line}");
            }
            text => {
                let (_, sent) = subscription.send_message(text).await?;
                if !sent {
                    eprintln!("{}", palette.failure("not sent: queued until connected, /retry to resend now"));
                }
            }
        }
    }

    drop(subscription);
    client.dispose()?;
    Ok(())
}

/// Prints deliveries for `channel`, skipping echoes of local sends.
fn print_incoming(palette: &Palette, channel: &str, message: &ServerMessage) {
    if let ServerMessage::Message(InboundMessage::Conversation(delivery)) = message {
        if delivery.channel() != channel {
            return;
        }
        if let ConversationDelivery::Event { sender, .. } = delivery {
            if sender == LOCAL_SENDER {
                return;
            }
        }
    }
    for line in format_server_message(palette, message) {
        println!("{line}");
    }
}
