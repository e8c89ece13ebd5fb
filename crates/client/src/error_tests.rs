// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn manager_gone_message() {
    assert_eq!(Error::ManagerGone.to_string(), "connection manager is no longer running");
}

#[test]
fn core_errors_are_transparent() {
    let err: Error = sl_core::Error::InvalidSubscriptionKey("nochannel".into()).into();
    assert_eq!(err.to_string(), sl_core::Error::InvalidSubscriptionKey("nochannel".into()).to_string());
}

#[test]
fn transport_errors_convert() {
    let err: Error = TransportError::NotOpen.into();
    assert!(err.to_string().starts_with("transport error:"));
}
