// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders shared across crates' test suites. Gated behind `test-support`
//! (or automatically enabled under `cfg(test)` within this crate).

use std::collections::BTreeMap;

use crate::{State, Target};

/// A minimal, buildable [`Target`] for tests — defaults to a no-op `up`.
pub struct TargetBuilder {
    target: Target,
}

impl TargetBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            target: Target {
                url: format!("https://example.com/{name}.git"),
                name,
                branch: None,
                up: vec!["true".to_string()],
                down: vec![],
                env: BTreeMap::new(),
                initial_run: true,
                auth: None,
            },
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.target.url = url.into();
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.target.branch = Some(branch.into());
        self
    }

    pub fn up(mut self, argv: &[&str]) -> Self {
        self.target.up = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn down(mut self, argv: &[&str]) -> Self {
        self.target.down = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.target.env.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Target {
        self.target
    }
}

/// A minimal, buildable [`State`] for tests.
pub struct StateBuilder {
    state: State,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            state: State::new(),
        }
    }

    pub fn target(mut self, target: Target) -> Self {
        self.state.targets.push(target);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.state.env.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> State {
        self.state
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
