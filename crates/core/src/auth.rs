// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// A named credential reference, resolved to a concrete credential at use
/// time by looking up `path` in the configured secret store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMethod {
    pub name: String,
    pub path: String,
    pub user_key: String,
    pub pass_key: String,
}
