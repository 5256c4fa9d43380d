// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// A non-fatal failure to clone or fetch a single repository on a poll tick.
#[derive(Debug, Error, Clone)]
#[error("git error for {url}: {message}")]
pub struct PollError {
    pub url: String,
    pub message: String,
}

impl PollError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// A fatal failure during a [`crate::PollerKind::Config`] poller's first
/// round, where every repository must clone successfully before the daemon
/// can proceed.
#[derive(Debug, Error, Clone)]
#[error("failed to initialise repository poller for {url}: {message}")]
pub struct PollerInitError {
    pub url: String,
    pub message: String,
}

impl PollerInitError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}
