// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Git remote descriptor used by the repository poller.
///
/// `pass` is a secret and must never reach logs or a serialised snapshot on
/// disk — see the custom [`fmt::Debug`] impl below.
#[derive(Clone, Serialize, Deserialize)]
pub struct Repo {
    pub url: String,
    pub user: Option<String>,
    pub pass: Option<String>,
}

impl Repo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            pass: None,
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }
}

impl fmt::Debug for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repo")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let repo = Repo::new("https://example.com/repo.git").with_credentials("bob", "hunter2");
        let rendered = format!("{repo:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
