// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tend_core::ExecutionTask;
use tend_secret::{prefixed_secrets, SecretStore};
use tokio::sync::mpsc;

use crate::{ExecuteError, ExecutorConfig};

/// Drains a channel of [`ExecutionTask`]s, merging secrets into each task's
/// environment before handing it to [`tend_core::Target::execute`].
pub struct ExecutorBus {
    store: Arc<dyn SecretStore>,
    config: ExecutorConfig,
}

impl ExecutorBus {
    pub fn new(store: Arc<dyn SecretStore>, config: ExecutorConfig) -> Self {
        Self { store, config }
    }

    /// Runs until `tasks` closes. Never returns early on a task failure.
    pub async fn subscribe(&self, mut tasks: mpsc::Receiver<ExecutionTask>) {
        while let Some(task) = tasks.recv().await {
            if let Err(e) = self.execute(&task).await {
                tracing::error!(
                    target = %task.target.name,
                    shutdown = task.shutdown,
                    error = %e,
                    "execution task failed"
                );
            }
        }
    }

    async fn execute(&self, task: &ExecutionTask) -> Result<(), ExecuteError> {
        let span = tracing::info_span!(
            "execution_task",
            target = %task.target.name,
            shutdown = task.shutdown
        );
        let _guard = span.enter();
        tracing::info!("executing");

        let globals = prefixed_secrets(
            self.store.as_ref(),
            &self.config.config_secret_path,
            &self.config.config_secret_prefix,
        )
        .await
        .map_err(ExecuteError::GlobalSecrets)?;

        let target_secrets =
            self.store
                .secrets_for(&task.target.name)
                .await
                .map_err(|source| ExecuteError::TargetSecrets {
                    target: task.target.name.clone(),
                    source,
                })?;

        // globals -> task.env -> per-target secrets; later entries win
        let mut merged = globals;
        merged.extend(task.env.clone());
        merged.extend(target_secrets);

        let result = task
            .target
            .execute(&task.path, &merged, task.shutdown, self.config.pass_environment)
            .await
            .map_err(|source| ExecuteError::Target {
                target: task.target.name.clone(),
                source,
            });

        match &result {
            Ok(()) => tracing::info!("execution task complete"),
            Err(e) => tracing::error!(error = %e, "execution task errored"),
        }
        result
    }
}
