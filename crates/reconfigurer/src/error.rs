// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use tend_git::PollerInitError;

/// Errors from the reconfigurer. Unlike [`tend_config::ConfigError`] (which
/// the reconfigurer swallows and logs per spec §4.6), everything here is
/// fatal and bubbles up to the service supervisor.
#[derive(Debug, Error)]
pub enum ReconfigurerError {
    #[error("config poller failed to initialise: {0}")]
    PollerInit(#[from] PollerInitError),

    #[error("config poller task ended without reporting its initial state")]
    PollerDied,

    #[error("watcher is no longer accepting state updates")]
    WatcherClosed,
}
