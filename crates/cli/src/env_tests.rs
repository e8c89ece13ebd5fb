// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn test_vars_constants() {
    assert_eq!(vars::SOCKLINE_URL, "SOCKLINE_URL");
    assert_eq!(vars::SOCKLINE_TOKEN, "SOCKLINE_TOKEN");
    assert_eq!(vars::SOCKLINE_STATE_DIR, "SOCKLINE_STATE_DIR");
    assert_eq!(vars::NO_COLOR, "NO_COLOR");
    assert_eq!(vars::COLOR, "COLOR");
}

#[test]
fn test_token_empty_is_unset() {
    std::env::set_var("SOCKLINE_TOKEN", "");
    assert_eq!(token(), None);
    std::env::set_var("SOCKLINE_TOKEN", "secret");
    assert_eq!(token().as_deref(), Some("secret"));
    std::env::remove_var("SOCKLINE_TOKEN");
}

#[test]
fn test_state_dir_set() {
    std::env::set_var("SOCKLINE_STATE_DIR", "/tmp/sockline-state");
    assert_eq!(state_dir(), Some(PathBuf::from("/tmp/sockline-state")));
    std::env::remove_var("SOCKLINE_STATE_DIR");
    assert_eq!(state_dir(), None);
}

#[test]
fn test_no_color_requires_one() {
    std::env::set_var("NO_COLOR", "0");
    assert!(!no_color());
    std::env::set_var("NO_COLOR", "1");
    assert!(no_color());
    std::env::remove_var("NO_COLOR");
}
