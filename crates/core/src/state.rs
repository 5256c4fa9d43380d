// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AuthMethod, Target};

/// A desired-state snapshot: the ordered list of targets, a global env
/// merged into every target, and the named auth methods available to the
/// repository poller.
///
/// Target order is not semantically meaningful but must be stable across
/// calls so [`crate::diff_targets`] is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub targets: Vec<Target>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub auths: Vec<AuthMethod>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// All target names, in target order. Useful for duplicate-name checks.
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.name.as_str())
    }
}
