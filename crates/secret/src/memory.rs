// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{SecretError, SecretStore};

/// An in-memory table-of-tables [`SecretStore`], used for tests and when no
/// external store is configured. Never supports renewal.
#[derive(Default)]
pub struct MemoryStore {
    secrets: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (replacing) the secret table for `name`.
    pub fn set(&self, name: impl Into<String>, table: BTreeMap<String, String>) {
        self.secrets.lock().insert(name.into(), table);
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn secrets_for(&self, name: &str) -> Result<BTreeMap<String, String>, SecretError> {
        Ok(self.secrets.lock().get(name).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_target_returns_empty_not_error() {
        let store = MemoryStore::new();
        let secrets = store.secrets_for("nope").await.unwrap();
        assert!(secrets.is_empty());
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MemoryStore::new();
        store.set(
            "svc",
            [("TOKEN".to_string(), "xyz".to_string())].into_iter().collect(),
        );
        let secrets = store.secrets_for("svc").await.unwrap();
        assert_eq!(secrets.get("TOKEN"), Some(&"xyz".to_string()));
    }
}
