// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::SecretError;

/// Obtains secrets for a named target from an external store.
///
/// `secrets_for` returning `Ok(empty map)` is the normal "no secrets
/// configured for this target" case and must not be surfaced as an error.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the flat secret map at the store's configured base path
    /// joined with `name`.
    async fn secrets_for(&self, name: &str) -> Result<BTreeMap<String, String>, SecretError>;

    /// Whether this store has a lease that needs periodic renewal. The
    /// service supervisor only spawns the renew loop when this is `true`.
    fn supports_renew(&self) -> bool {
        false
    }

    /// Blocks until `cancel` fires, refreshing the store's authentication
    /// token on an interval; returns on the first unrecoverable failure.
    /// Only called when [`SecretStore::supports_renew`] is `true`.
    async fn renew(&self, cancel: CancellationToken) -> Result<(), SecretError> {
        cancel.cancelled().await;
        Ok(())
    }
}

/// Reads the map at `path` and returns only the entries whose keys begin
/// with `prefix`. This is how "global" secrets (e.g. `GLOBAL_*`) are pulled
/// and injected into every target's env.
pub async fn prefixed_secrets(
    store: &dyn SecretStore,
    path: &str,
    prefix: &str,
) -> Result<BTreeMap<String, String>, SecretError> {
    let all = store.secrets_for(path).await?;
    Ok(all
        .into_iter()
        .filter(|(k, _)| k.starts_with(prefix))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn prefixed_secrets_filters_by_prefix() {
        let store = MemoryStore::new();
        store.set(
            "config",
            [
                ("GLOBAL_TOKEN".to_string(), "abc".to_string()),
                ("GLOBAL_URL".to_string(), "https://x".to_string()),
                ("UNRELATED".to_string(), "nope".to_string()),
            ]
            .into_iter()
            .collect(),
        );

        let secrets = prefixed_secrets(&store, "config", "GLOBAL_").await.unwrap();
        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets.get("GLOBAL_TOKEN"), Some(&"abc".to_string()));
        assert!(!secrets.contains_key("UNRELATED"));
    }

    #[tokio::test]
    async fn prefixed_secrets_empty_for_missing_path() {
        let store = MemoryStore::new();
        let secrets = prefixed_secrets(&store, "config", "GLOBAL_").await.unwrap();
        assert!(secrets.is_empty());
    }
}
