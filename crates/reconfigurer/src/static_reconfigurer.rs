// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tend_core::State;
use tend_watcher::Watcher;

use crate::error::ReconfigurerError;

/// A fixed-state stand-in for [`crate::Reconfigurer`], used in tests that
/// want a known [`State`] without standing up a git repository.
pub struct StaticReconfigurer {
    state: State,
}

impl StaticReconfigurer {
    pub fn new(state: State) -> Self {
        Self { state }
    }

    /// Calls `watcher.set_state` exactly once with the fixed state.
    pub async fn configure(&self, watcher: &Watcher) -> Result<(), ReconfigurerError> {
        watcher
            .set_state(self.state.clone())
            .await
            .map_err(|_| ReconfigurerError::WatcherClosed)
    }
}
