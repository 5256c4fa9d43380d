// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from reading or renewing secrets.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to reach secret store: {0}")]
    Request(#[from] reqwest::Error),

    #[error("secret store returned an unexpected response at {path}: {reason}")]
    UnexpectedResponse { path: String, reason: String },

    #[error("non-string value for key {key:?} at {path}")]
    NonStringValue { path: String, key: String },

    #[error("could not determine KV engine version at '{0}': neither /config nor a list succeeded")]
    UnknownEngineVersion(String),

    #[error("failed to renew secret store lease: {0}")]
    RenewFailed(String),
}
