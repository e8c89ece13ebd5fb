// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod chat;
pub mod config;
pub mod listen;

use std::path::PathBuf;
use std::sync::Arc;

use sl_client::{ManagerCallbacks, ManagerOptions, SocketClient, TokioClock};
use sl_core::{FileStorage, Storage};
use tracing::debug;

use crate::cli::GlobalArgs;
use crate::colors::Palette;
use crate::config::{state_dir, Config};
use crate::error::Result;

/// Resolved settings shared by every command.
pub struct Context {
    pub config: Config,
    pub state_dir: PathBuf,
    pub palette: Palette,
}

impl Context {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        Ok(Context {
            config: Config::resolve(args)?,
            state_dir: state_dir(args.state_dir.as_deref()),
            palette: Palette::detect(),
        })
    }

    /// Starts a client persisting to the state dir. Needs a tokio runtime.
    pub fn start_client(&self, callbacks: ManagerCallbacks) -> Result<SocketClient> {
        debug!("state dir {}", self.state_dir.display());
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(&self.state_dir)?);
        let options = ManagerOptions { storage, clock: Arc::new(TokioClock::new()), callbacks };
        Ok(SocketClient::start(self.config.connection.clone(), options)?)
    }

    /// Callbacks printing state changes and errors.
    pub fn status_callbacks(&self) -> ManagerCallbacks {
        let (states, errors) = (self.palette, self.palette);
        ManagerCallbacks::new()
            .on_connection_state_change(move |state| {
                eprintln!("{}", crate::display::format_state(&states, state));
            })
            .on_error(move |error| eprintln!("{}", crate::display::format_error(&errors, error)))
    }
}
