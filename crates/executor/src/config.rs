// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Process-wide settings the executor needs outside of any one task.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Whether child processes inherit the daemon's own environment in
    /// addition to the merged secret/env map.
    pub pass_environment: bool,
    /// Path in the secret store where global secrets live.
    pub config_secret_path: String,
    /// Only keys with this prefix are pulled from `config_secret_path` and
    /// merged into every target's environment.
    pub config_secret_prefix: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            pass_environment: false,
            config_secret_path: "config".to_string(),
            config_secret_prefix: "GLOBAL_".to_string(),
        }
    }
}
