// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

const QUICKSTART_HELP: &str = "\
Get started:
  sockline config                          Show the effective connection settings
  sockline listen -c general -n alerts     Print everything arriving on two channels
  sockline chat general                    Chat on a conversation channel";

#[derive(Parser)]
#[command(name = "sockline", version)]
#[command(about = "Resilient pub/sub WebSocket client")]
#[command(
    long_about = "Resilient pub/sub WebSocket client.\n\n\
    Keeps one connection alive with heartbeats and backoff reconnection, restores \
    subscriptions after reconnecting, and queues messages sent while offline."
)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: <config dir>/sockline/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server URL, overrides the config file and SOCKLINE_URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Access token, overrides the config file and SOCKLINE_TOKEN
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Directory for the offline queue and failed messages
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the effective connection config as TOML
    Config,

    /// Print messages and notifications from channels until interrupted
    #[command(after_help = "Examples:\n  \
        sockline listen -c general              One conversation channel\n  \
        sockline listen -n alerts -n deploys    Two notification channels")]
    Listen {
        /// Conversation channel to subscribe to (repeatable)
        #[arg(long = "conversation", short = 'c', value_name = "CHANNEL")]
        conversations: Vec<String>,

        /// Notification channel to subscribe to (repeatable)
        #[arg(long = "notification", short = 'n', value_name = "CHANNEL")]
        notifications: Vec<String>,
    },

    /// Chat on a conversation channel, one message per stdin line
    #[command(after_help = "Commands typed on stdin:\n  \
        /retry     Resend every failed message\n  \
        /status    Show the connection status\n  \
        /quit      Leave the channel")]
    Chat {
        /// Conversation channel
        channel: String,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
