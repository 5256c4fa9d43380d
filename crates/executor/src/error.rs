// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from running a single [`tend_core::ExecutionTask`]. The bus logs
/// these and moves on; nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to fetch global secrets: {0}")]
    GlobalSecrets(#[source] tend_secret::SecretError),

    #[error("failed to fetch secrets for target {target}: {source}")]
    TargetSecrets {
        target: String,
        #[source]
        source: tend_secret::SecretError,
    },

    #[error("target {target} failed: {source}")]
    Target {
        target: String,
        #[source]
        source: tend_core::TargetError,
    },
}
