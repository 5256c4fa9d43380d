// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the process-wide tracing subscriber: an `EnvFilter` (default
/// `info`, overridable via `RUST_LOG`) feeding a `fmt` layer on stdout.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
