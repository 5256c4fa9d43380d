// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{SecretError, SecretStore};

const LIST: &str = "LIST";

/// Renewal attempts per tick and the constant delay between them, matching
/// `retrier.ConstantBackoff(3, 100*time.Millisecond)` around the original's
/// renew loop.
const RENEW_ATTEMPTS: u32 = 3;
const RENEW_BACKOFF: Duration = Duration::from_millis(100);

/// A [`SecretStore`] backed by a Hashicorp-Vault-compatible KV engine,
/// supporting both the v1 and v2 KV layouts (see spec §6.3).
pub struct VaultStore {
    client: reqwest::Client,
    addr: String,
    token: RwLock<String>,
    engine_path: String,
    item_path: String,
    version: u8,
    renewal: Duration,
}

impl VaultStore {
    /// Connects to the Vault-compatible server at `addr`, probes `base_path`
    /// for its KV engine version, and returns a ready-to-use store.
    pub async fn connect(
        addr: &str,
        base_path: &str,
        token: &str,
        renewal: Duration,
    ) -> Result<Self, SecretError> {
        let base_path = base_path.trim_start_matches('/');
        let (engine_path, item_path) = split_path(base_path);

        let client = reqwest::Client::builder()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let version = detect_kv_version(&client, addr, token, &engine_path).await?;

        tracing::debug!(
            kv_version = version,
            base_path,
            engine_path = %engine_path,
            "connected to vault-compatible secrets engine"
        );

        Ok(Self {
            client,
            addr: addr.trim_end_matches('/').to_string(),
            token: RwLock::new(token.to_string()),
            engine_path,
            item_path,
            version,
            renewal,
        })
    }

    fn build_path(&self, item: &str) -> String {
        if self.version == 1 {
            join(&[&self.engine_path, &self.item_path, item])
        } else {
            join(&[&self.engine_path, "data", &self.item_path, item])
        }
    }

    fn token(&self) -> String {
        self.token.read().clone()
    }

    async fn read(&self, path: &str) -> Result<Option<Value>, SecretError> {
        let url = format!("{}/v1/{}", self.addr, path);
        let response = self
            .client
            .get(&url)
            .header("X-Vault-Token", self.token())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        let body: Value = response.json().await?;
        Ok(Some(body))
    }
}

#[async_trait]
impl SecretStore for VaultStore {
    async fn secrets_for(&self, name: &str) -> Result<BTreeMap<String, String>, SecretError> {
        let path = self.build_path(name);
        tracing::debug!(name, path = %path, "looking for secrets in vault");

        let Some(body) = self.read(&path).await? else {
            tracing::debug!(name, path = %path, "no secrets found");
            return Ok(BTreeMap::new());
        };

        let data = body
            .get("data")
            .ok_or_else(|| SecretError::UnexpectedResponse {
                path: path.clone(),
                reason: "missing top-level \"data\" field".to_string(),
            })?;

        let leaf = if self.version == 1 {
            data
        } else {
            data.get("data").ok_or_else(|| SecretError::UnexpectedResponse {
                path: path.clone(),
                reason: "missing nested \"data.data\" field for KV v2".to_string(),
            })?
        };

        value_to_string_map(leaf, &path)
    }

    fn supports_renew(&self) -> bool {
        true
    }

    async fn renew(&self, cancel: CancellationToken) -> Result<(), SecretError> {
        let mut ticker = tokio::time::interval(self.renewal);
        ticker.tick().await; // first tick fires immediately; skip it

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => self.renew_once_with_backoff().await?,
            }
        }
    }
}

impl VaultStore {
    /// Performs one token-renewal HTTP round-trip.
    async fn renew_once(&self) -> Result<(), SecretError> {
        let url = format!("{}/v1/auth/token/renew-self", self.addr);
        let response = self
            .client
            .post(&url)
            .header("X-Vault-Token", self.token())
            .send()
            .await
            .map_err(|e| SecretError::RenewFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| SecretError::RenewFailed(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SecretError::RenewFailed(e.to_string()))?;
        if let Some(new_token) = body
            .get("auth")
            .and_then(|a| a.get("client_token"))
            .and_then(Value::as_str)
        {
            *self.token.write() = new_token.to_string();
        }
        tracing::debug!("renewed vault token lease");
        Ok(())
    }

    /// Retries [`Self::renew_once`] up to `RENEW_ATTEMPTS` times, waiting
    /// `RENEW_BACKOFF` between attempts, before giving up on a transient
    /// HTTP failure.
    async fn renew_once_with_backoff(&self) -> Result<(), SecretError> {
        for attempt in 1..RENEW_ATTEMPTS {
            match self.renew_once().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "vault token renewal attempt failed");
                    tokio::time::sleep(RENEW_BACKOFF).await;
                }
            }
        }
        self.renew_once().await
    }
}

/// Splits a base path into its engine (first segment) and item path (rest).
fn split_path(base_path: &str) -> (String, String) {
    let base_path = base_path.trim_matches('/');
    match base_path.split_once('/') {
        Some((engine, rest)) if !rest.is_empty() => (engine.to_string(), rest.to_string()),
        _ => (base_path.to_string(), String::new()),
    }
}

fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// Probes `engine_path` to determine KV v1 vs v2: a successful `/config`
/// read means v2; otherwise a successful `LIST` of the engine root means v1;
/// an empty response from both is an error.
async fn detect_kv_version(
    client: &reqwest::Client,
    addr: &str,
    token: &str,
    engine_path: &str,
) -> Result<u8, SecretError> {
    let config_url = format!("{addr}/v1/{engine_path}/config");
    let config_response = client
        .get(&config_url)
        .header("X-Vault-Token", token)
        .send()
        .await?;

    if config_response.status().is_success() {
        return Ok(2);
    }

    let list_method = Method::from_bytes(LIST.as_bytes()).expect("LIST is a valid HTTP method");
    let list_url = format!("{addr}/v1/{engine_path}/");
    let list_response = client
        .request(list_method, &list_url)
        .header("X-Vault-Token", token)
        .send()
        .await?;

    if list_response.status().is_success() {
        return Ok(1);
    }

    Err(SecretError::UnknownEngineVersion(engine_path.to_string()))
}

fn value_to_string_map(value: &Value, path: &str) -> Result<BTreeMap<String, String>, SecretError> {
    let object = value.as_object().ok_or_else(|| SecretError::UnexpectedResponse {
        path: path.to_string(),
        reason: "secret data is not a JSON object".to_string(),
    })?;

    let mut map = BTreeMap::new();
    for (key, value) in object {
        let s = value
            .as_str()
            .ok_or_else(|| SecretError::NonStringValue {
                path: path.to_string(),
                key: key.clone(),
            })?;
        map.insert(key.clone(), s.to_string());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_separates_engine_and_item() {
        assert_eq!(
            split_path("secret/pico/targets"),
            ("secret".to_string(), "pico/targets".to_string())
        );
    }

    #[test]
    fn split_path_with_no_rest() {
        assert_eq!(split_path("secret"), ("secret".to_string(), String::new()));
    }

    #[test]
    fn value_to_string_map_rejects_non_string() {
        let value = serde_json::json!({ "a": 1 });
        let err = value_to_string_map(&value, "x").unwrap_err();
        assert!(matches!(err, SecretError::NonStringValue { .. }));
    }

    #[test]
    fn value_to_string_map_accepts_strings() {
        let value = serde_json::json!({ "a": "1", "b": "2" });
        let map = value_to_string_map(&value, "x").unwrap();
        assert_eq!(map.get("a"), Some(&"1".to_string()));
    }
}
