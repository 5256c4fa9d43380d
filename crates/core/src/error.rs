// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from running a [`crate::Target`]'s `up`/`down` command.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("target has no {0} command configured")]
    EmptyCommand(&'static str),

    #[error("failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("command exited with non-zero status: {0}")]
    NonZeroExit(std::process::ExitStatus),
}
