// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn test_config_not_found_names_path() {
    let err = Error::ConfigNotFound(PathBuf::from("/nowhere/config.toml"));
    assert_eq!(err.to_string(), "config file not found: /nowhere/config.toml");
}

#[test]
fn test_no_channels_has_hint() {
    assert!(Error::NoChannels.to_string().contains("hint:"));
}

#[test]
fn test_client_error_is_transparent() {
    let err = Error::from(sl_client::Error::Config("bad url".to_string()));
    assert_eq!(err.to_string(), "invalid configuration: bad url");
}
