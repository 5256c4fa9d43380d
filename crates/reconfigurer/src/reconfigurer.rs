// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tend_git::{GitAuth, PollerKind, RepoPoller, Repository};
use tend_watcher::Watcher;
use tokio_util::sync::CancellationToken;

use crate::error::ReconfigurerError;

const CONFIG_DIRECTORY: &str = "config";

/// Drives the config repository poller and reloads [`tend_config::load`]
/// whenever the repository's `HEAD` moves, pushing the result into a
/// [`Watcher`]. A bad config push never crashes the daemon: load failures
/// are logged and the watcher keeps its prior state.
pub struct Reconfigurer {
    config_repo_url: String,
    hostname: String,
    directory: PathBuf,
    poll_interval: Duration,
    auth: GitAuth,
    process_env: BTreeMap<String, String>,
}

impl Reconfigurer {
    pub fn new(
        config_repo_url: impl Into<String>,
        hostname: impl Into<String>,
        directory: PathBuf,
        poll_interval: Duration,
        auth: GitAuth,
        process_env: BTreeMap<String, String>,
    ) -> Self {
        Self {
            config_repo_url: config_repo_url.into(),
            hostname: hostname.into(),
            directory,
            poll_interval,
            auth,
            process_env,
        }
    }

    /// Starts the config poller, performs the initial configure, then
    /// reloads on every subsequent commit event until `shutdown` fires.
    pub async fn configure(&self, watcher: &Watcher, shutdown: CancellationToken) -> Result<(), ReconfigurerError> {
        let repo = Repository::new(self.config_repo_url.clone(), CONFIG_DIRECTORY.to_string());
        let mut poller = RepoPoller::new(
            vec![repo],
            self.poll_interval,
            self.directory.clone(),
            self.auth.clone(),
            PollerKind::Config,
        );

        (&mut poller.initial_done)
            .await
            .map_err(|_| ReconfigurerError::PollerDied)??;

        self.apply_current_config(watcher).await?;

        loop {
            tokio::select! {
                event = poller.events.recv() => {
                    match event {
                        Some(_) => self.apply_current_config(watcher).await?,
                        None => return Err(ReconfigurerError::PollerDied),
                    }
                }
                Some(err) = poller.errors.recv() => {
                    tracing::error!(url = %err.url, message = %err.message, "config poller error");
                }
                _ = shutdown.cancelled() => {
                    poller.close();
                    return Ok(());
                }
            }
        }
    }

    async fn apply_current_config(&self, watcher: &Watcher) -> Result<(), ReconfigurerError> {
        let path = self.directory.join(CONFIG_DIRECTORY);
        let mut state = match tend_config::load(&path, &self.hostname, &self.process_env) {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, "failed to load config, keeping prior state");
                return Ok(());
            }
        };

        if !self.hostname.is_empty() {
            state.env.insert("HOSTNAME".to_string(), self.hostname.clone());
        }

        watcher
            .set_state(state)
            .await
            .map_err(|_| ReconfigurerError::WatcherClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn init_bare_repo_with_commit_at(dir: &std::path::Path, file_name: &str, contents: &str) {
        let repo = git2::Repository::init(dir).expect("init");
        std::fs::write(dir.join(file_name), contents).expect("write script");
        let sig = git2::Signature::now("tend", "tend@example.com").expect("sig");
        let mut index = repo.index().expect("index");
        index.add_path(std::path::Path::new(file_name)).expect("add");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("write tree");
        let tree = repo.find_tree(tree_id).expect("find tree");
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .expect("commit");
    }

    #[tokio::test]
    async fn loads_config_and_pushes_an_addition_task() {
        let upstream = tempfile::tempdir().expect("tempdir");
        init_bare_repo_with_commit_at(
            upstream.path(),
            "main.js",
            r#"T(#{ name: "svc", url: "https://example.com/svc.git", up: ["true"] });"#,
        );

        let cache = tempfile::tempdir().expect("tempdir");
        let (bus_tx, mut bus_rx) = mpsc::channel(4);
        let watcher = std::sync::Arc::new(Watcher::new(
            cache.path().to_path_buf(),
            Duration::from_secs(3600),
            GitAuth::None,
            bus_tx,
        ));

        let loop_watcher = std::sync::Arc::clone(&watcher);
        let shutdown = CancellationToken::new();
        let loop_shutdown = shutdown.clone();
        let watcher_handle = tokio::spawn(async move {
            loop_watcher
                .start(loop_shutdown)
                .await
        });

        let reconfigurer = Reconfigurer::new(
            format!("file://{}", upstream.path().display()),
            "host-a",
            cache.path().to_path_buf(),
            Duration::from_secs(3600),
            GitAuth::None,
            BTreeMap::new(),
        );

        let reconfigure_shutdown = CancellationToken::new();
        let configure_shutdown = reconfigure_shutdown.clone();
        let configure_watcher = std::sync::Arc::clone(&watcher);
        let configure_handle = tokio::spawn(async move {
            reconfigurer.configure(&configure_watcher, configure_shutdown).await
        });

        let task = bus_rx.recv().await.expect("expected an execution task");
        assert_eq!(task.target.name, "svc");

        reconfigure_shutdown.cancel();
        shutdown.cancel();
        configure_handle.await.expect("join").expect("configure should succeed");
        let _ = watcher_handle.await;
    }
}
