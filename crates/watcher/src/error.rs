// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use tend_git::PollerInitError;

/// Errors from the watcher's daemon loop. Every variant here is fatal and
/// bubbles up to the service supervisor (spec §7's propagation policy);
/// anything non-fatal (an unknown target event, a mid-run fetch failure) is
/// logged in place instead of being represented here.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("attempt to handle event for unknown target at url {0}")]
    UnknownTarget(String),

    #[error("targets poller failed to initialise: {0}")]
    PollerInit(#[from] PollerInitError),

    #[error("targets poller task ended without reporting its initial state")]
    PollerDied,

    #[error("execution bus is closed")]
    BusClosed,

    #[error("watcher has already been started")]
    AlreadyStarted,

    #[error("state channel closed before an initial state was set")]
    NoInitialState,
}
