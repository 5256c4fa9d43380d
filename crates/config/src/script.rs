// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The shape `T(obj)` accepts. Structurally identical to
/// [`tend_core::Target`] except every field is required to go through
/// `serde`'s missing-field error, which becomes the "whole load fails"
/// behaviour spec §6.1 asks for.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct TargetScript {
    pub name: String,
    pub url: String,
    pub up: Vec<String>,
    #[serde(default)]
    pub down: Vec<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub initial_run: bool,
    #[serde(default)]
    pub auth: Option<String>,
}

/// The shape `A(obj)` accepts, identical to [`tend_core::AuthMethod`].
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct AuthScript {
    pub name: String,
    pub path: String,
    pub user_key: String,
    pub pass_key: String,
}

/// Shared accumulator the `T`/`E`/`A` host functions write into while the
/// concatenated scripts evaluate.
#[derive(Debug, Default)]
pub(crate) struct Accumulator {
    pub targets: Vec<TargetScript>,
    pub auths: Vec<AuthScript>,
    pub env: BTreeMap<String, String>,
}

impl Accumulator {
    pub fn into_state_json(self) -> serde_json::Value {
        serde_json::json!({
            "targets": self.targets,
            "auths": self.auths,
            "env": self.env,
        })
    }
}
