// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Nothing listens here, so connection attempts are refused.
pub const UNREACHABLE_URL: &str = "ws://127.0.0.1:1/ws";

pub fn sockline() -> Command {
    cargo_bin_cmd!("sockline")
}

/// Temp dir with an empty config file and a state dir.
pub struct Sandbox {
    pub temp: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "").unwrap();
        Sandbox { temp }
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp.path().join("config.toml")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.temp.path().join("state")
    }

    pub fn write_config(&self, content: &str) {
        std::fs::write(self.config_path(), content).unwrap();
    }

    /// `sockline` isolated from the user's config, state and environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = sockline();
        cmd.env_remove("SOCKLINE_URL")
            .env_remove("SOCKLINE_TOKEN")
            .env_remove("SOCKLINE_STATE_DIR")
            .env("NO_COLOR", "1")
            .arg("--config")
            .arg(self.config_path())
            .arg("--state-dir")
            .arg(self.state_dir());
        cmd
    }
}
