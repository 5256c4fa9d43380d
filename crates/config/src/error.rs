// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors raised while loading and evaluating the `.js` configuration
/// scripts. The reconfigurer treats every variant as non-fatal: it logs and
/// keeps the prior [`tend_core::State`] (see spec §4.6).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read script {path}: {source}")]
    ReadScript {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("could not interpret accumulated state as JSON: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("targets {first} and {second} both resolve to working directory {directory:?}")]
    DuplicateWorkingDir {
        first: String,
        second: String,
        directory: std::path::PathBuf,
    },

    #[error("target {name}: {source}")]
    InvalidTarget {
        name: String,
        #[source]
        source: tend_core::TargetError,
    },
}
