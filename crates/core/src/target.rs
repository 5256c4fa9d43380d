// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::TargetError;

/// One managed workload: a Git repository plus the commands to run when it
/// advances (`up`) or is torn down (`down`).
///
/// `name` is unique within a [`crate::State`] and also names the working
/// copy's subdirectory under the cache root (see [`Target::working_dir`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub up: Vec<String>,
    #[serde(default)]
    pub down: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub initial_run: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

impl Target {
    /// Validating constructor: rejects a target with no `up` command, the
    /// same check `execute` makes at run time, just moved to construction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        branch: Option<String>,
        up: Vec<String>,
        down: Vec<String>,
        env: BTreeMap<String, String>,
        initial_run: bool,
        auth: Option<String>,
    ) -> Result<Self, TargetError> {
        if up.is_empty() {
            return Err(TargetError::EmptyCommand("up"));
        }
        Ok(Self {
            name: name.into(),
            url: url.into(),
            branch,
            up,
            down,
            env,
            initial_run,
            auth,
        })
    }

    /// The working-copy subdirectory name: `<name>` or `<name>_<branch>`.
    pub fn working_dir(&self, cache_root: &Path) -> PathBuf {
        match &self.branch {
            Some(branch) => cache_root.join(format!("{}_{}", self.name, branch)),
            None => cache_root.join(&self.name),
        }
    }

    /// Runs this target's `up` or `down` command in `dir`.
    ///
    /// The child environment starts from the process environment only when
    /// `inherit_proc_env` is set, then has `env` applied on top (caller's
    /// `env` wins over anything inherited, and `self.env` wins over the
    /// caller's `env` — see the merge order in [`Target::merge_env`]).
    /// Stdout and stderr are both routed to the daemon's stdout. Blocks
    /// until the child exits.
    pub async fn execute(
        &self,
        dir: &Path,
        env: &BTreeMap<String, String>,
        shutdown: bool,
        inherit_proc_env: bool,
    ) -> Result<(), TargetError> {
        let command = if shutdown { &self.down } else { &self.up };
        let Some((program, args)) = command.split_first() else {
            return Err(TargetError::EmptyCommand(if shutdown { "down" } else { "up" }));
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if !inherit_proc_env {
            cmd.env_clear();
        }
        for (k, v) in self.merge_env(env) {
            cmd.env(k, v);
        }

        let status = cmd.status().await.map_err(TargetError::Spawn)?;
        check_status(status)
    }

    /// Merges the caller-supplied `env` with this target's own `env`, with
    /// `self.env` winning on key collision.
    pub fn merge_env(&self, env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut merged = env.clone();
        merged.extend(self.env.clone());
        merged
    }
}

fn check_status(status: ExitStatus) -> Result<(), TargetError> {
    if status.success() {
        Ok(())
    } else {
        Err(TargetError::NonZeroExit(status))
    }
}
