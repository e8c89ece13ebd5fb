// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! sockline - command-line front end for the sl-client pub/sub client.
//!
//! # Commands
//!
//! - `config` prints the effective connection settings
//! - `listen` prints deliveries from conversation and notification channels
//! - `chat` sends stdin lines to a conversation channel
//!
//! The offline queue and failed messages persist under the state dir, so
//! messages typed while disconnected survive a restart.

mod cli;
pub mod colors;
mod commands;
pub mod config;
pub mod display;
mod env;
pub mod error;
mod logging;

pub use cli::{Cli, Command, GlobalArgs};
pub use config::Config;
pub use error::{Error, Result};

use commands::Context;

/// Runs one parsed invocation to completion.
pub fn run(cli: Cli) -> Result<()> {
    logging::setup_logging(cli.global.verbose, cli.global.log_file.as_deref());
    let ctx = Context::from_args(&cli.global)?;
    match cli.command {
        Command::Config => commands::config::run(&ctx),
        Command::Listen { conversations, notifications } => {
            runtime()?.block_on(commands::listen::run(&ctx, &conversations, &notifications))
        }
        Command::Chat { channel } => runtime()?.block_on(commands::chat::run(&ctx, &channel)),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread().enable_all().build()?)
}
