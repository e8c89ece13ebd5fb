// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal colors for message output.
//!
//! Respects environment variables:
//! - `NO_COLOR=1`: Disables colors
//! - `COLOR=1`: Forces colors even without TTY

use std::io::IsTerminal;

use crate::env;

/// ANSI 256-color codes.
pub mod codes {
    /// Channel names and senders
    pub const CHANNEL: u8 = 74;
    /// Timestamps and pending markers
    pub const CONTEXT: u8 = 245;
    /// Failed messages and errors
    pub const FAILURE: u8 = 167;
    /// Connection state changes
    pub const STATE: u8 = 179;
}

const RESET: &str = "\x1b[0m";

/// Check if colors should be enabled based on TTY and environment variables.
pub fn should_colorize() -> bool {
    if env::no_color() {
        return false;
    }
    if env::force_color() {
        return true;
    }
    std::io::stdout().is_terminal()
}

/// Wraps text in escape codes, or passes it through when disabled.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub const fn new(enabled: bool) -> Self {
        Palette { enabled }
    }

    /// Palette following [`should_colorize`].
    pub fn detect() -> Self {
        Self::new(should_colorize())
    }

    fn paint(&self, code: u8, text: &str) -> String {
        if self.enabled {
            format!("\x1b[38;5;{code}m{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn channel(&self, text: &str) -> String {
        self.paint(codes::CHANNEL, text)
    }

    pub fn context(&self, text: &str) -> String {
        self.paint(codes::CONTEXT, text)
    }

    pub fn failure(&self, text: &str) -> String {
        self.paint(codes::FAILURE, text)
    }

    pub fn state(&self, text: &str) -> String {
        self.paint(codes::STATE, text)
    }
}

#[cfg(test)]
#[path = "colors_tests.rs"]
mod tests;
