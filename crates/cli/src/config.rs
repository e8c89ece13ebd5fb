// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI configuration.
//!
//! Settings live in a TOML file with a single `[connection]` table holding
//! the connection manager settings. Precedence, lowest first: built-in
//! defaults, the config file, environment variables, command-line flags.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sl_client::ManagerConfig;

use crate::cli::GlobalArgs;
use crate::env;
use crate::error::{Error, Result};

const APP_DIR_NAME: &str = "sockline";
const CONFIG_FILE_NAME: &str = "config.toml";
const REDACTED: &str = "<redacted>";

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ManagerConfig,
}

impl Config {
    /// Reads `path`. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse(&content, path)
    }

    /// Reads `explicit` if given, else the default file if it exists, else defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| Error::ConfigParse { path: path.to_path_buf(), source })
    }

    /// Applies a URL and token override when present.
    pub fn apply_overrides(&mut self, url: Option<String>, token: Option<String>) {
        if let Some(url) = url {
            self.connection.url = url;
        }
        if let Some(token) = token {
            self.connection.token = token;
        }
    }

    /// Loads the file named by `args`, then layers environment and flags on top.
    pub fn resolve(args: &GlobalArgs) -> Result<Self> {
        let mut config = Self::load_or_default(args.config.as_deref())?;
        config.apply_overrides(env::url(), env::token());
        config.apply_overrides(args.url.clone(), args.token.clone());
        config.connection.validate()?;
        Ok(config)
    }

    /// TOML rendering with the token hidden.
    pub fn to_toml_redacted(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.connection.token.is_empty() {
            shown.connection.token = REDACTED.to_string();
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

/// `<config dir>/sockline/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Directory holding the durable queue and failed messages.
///
/// Priority: `explicit`, `SOCKLINE_STATE_DIR`, the platform state dir, the
/// local data dir, then `./.sockline`.
pub fn state_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = env::state_dir() {
        return dir;
    }
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".sockline"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
