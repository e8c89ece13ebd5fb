// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tracing::info;

use super::Context;
use crate::display::format_server_message;
use crate::error::{Error, Result};

/// Subscribes to every given channel and prints what arrives until Ctrl-C.
pub async fn run(ctx: &Context, conversations: &[String], notifications: &[String]) -> Result<()> {
    if conversations.is_empty() && notifications.is_empty() {
        return Err(Error::NoChannels);
    }

    let palette = ctx.palette;
    let callbacks = ctx.status_callbacks().on_message(move |message| {
        for line in format_server_message(&palette, message) {
            println!("{line}");
        }
    });
    let client = ctx.start_client(callbacks)?;

    let conversation_subs: Vec<_> = conversations.iter().map(|ch| client.conversation(ch)).collect();
    let notification_subs: Vec<_> = notifications.iter().map(|ch| client.notification(ch)).collect();
    info!(
        "Listening on {} conversation and {} notification channels",
        conversation_subs.len(),
        notification_subs.len()
    );
    client.connect()?;

    tokio::signal::ctrl_c().await?;

    drop(conversation_subs);
    drop(notification_subs);
    client.dispose()?;
    Ok(())
}
