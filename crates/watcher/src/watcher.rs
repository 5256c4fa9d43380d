// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tend_core::{diff_targets, ExecutionTask, State, Target};
use tend_git::{CommitEvent, GitAuth, PollError, PollerKind, RepoPoller, Repository};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::WatcherError;

enum PollerEvent {
    Commit(CommitEvent),
    Error(PollError),
}

/// Keeps a set of managed targets in sync with their git repositories,
/// dispatching `up`/`down` execution tasks onto `bus` as targets appear,
/// change, or are removed.
///
/// Reconfiguration and commit-event handling never interleave: both are
/// processed by the same `select!` in [`Watcher::start`], one at a time.
pub struct Watcher {
    state: Mutex<State>,
    new_state_tx: mpsc::Sender<State>,
    new_state_rx: Mutex<Option<mpsc::Receiver<State>>>,
    bus: mpsc::Sender<ExecutionTask>,
    directory: PathBuf,
    poll_interval: Duration,
    auth: GitAuth,
    initialised: AtomicBool,
}

impl Watcher {
    pub fn new(
        directory: PathBuf,
        poll_interval: Duration,
        auth: GitAuth,
        bus: mpsc::Sender<ExecutionTask>,
    ) -> Self {
        let (new_state_tx, new_state_rx) = mpsc::channel(1);
        Self {
            state: Mutex::new(State::default()),
            new_state_tx,
            new_state_rx: Mutex::new(Some(new_state_rx)),
            bus,
            directory,
            poll_interval,
            auth,
            initialised: AtomicBool::new(false),
        }
    }

    /// Enqueues `new_state` for the daemon loop to reconfigure against. The
    /// very first call is consumed by [`Watcher::start`] to perform the
    /// initial configure before the loop begins.
    pub async fn set_state(&self, new_state: State) -> Result<(), WatcherError> {
        self.new_state_tx
            .send(new_state)
            .await
            .map_err(|_| WatcherError::BusClosed)
    }

    /// A read-only snapshot of the current state.
    pub fn get_state(&self) -> State {
        self.state.lock().clone()
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised.load(Ordering::SeqCst)
    }

    /// Looks up the target for `event.url` in the current state and pushes
    /// a non-shutdown execution task for it.
    pub async fn handle(&self, event: CommitEvent) -> Result<(), WatcherError> {
        let (target, env) = {
            let state = self.state.lock();
            let target = state
                .targets
                .iter()
                .find(|t| t.url == event.url)
                .cloned()
                .ok_or_else(|| WatcherError::UnknownTarget(event.url.clone()))?;
            (target, state.env.clone())
        };

        self.bus
            .send(ExecutionTask {
                target,
                path: event.path,
                shutdown: false,
                env,
            })
            .await
            .map_err(|_| WatcherError::BusClosed)
    }

    /// Waits for the first queued state, performs the initial configure
    /// inline, then runs the four-way daemon loop until `shutdown` fires.
    pub async fn start(&self, shutdown: CancellationToken) -> Result<(), WatcherError> {
        let mut new_state_rx = self
            .new_state_rx
            .lock()
            .take()
            .ok_or(WatcherError::AlreadyStarted)?;

        let first_state = new_state_rx.recv().await.ok_or(WatcherError::NoInitialState)?;
        let mut targets_poller: Option<RepoPoller> = None;
        self.do_reconfigure(&mut targets_poller, first_state).await?;
        self.initialised.store(true, Ordering::SeqCst);

        loop {
            tokio::select! {
                Some(new_state) = new_state_rx.recv() => {
                    self.do_reconfigure(&mut targets_poller, new_state).await?;
                }
                event = poll_targets(&mut targets_poller) => {
                    match event {
                        PollerEvent::Commit(commit) => {
                            if let Err(e) = self.handle(commit).await {
                                tracing::error!(error = %e, "failed to handle target event");
                            }
                        }
                        PollerEvent::Error(err) => {
                            tracing::error!(url = %err.url, message = %err.message, "git poll error");
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    if let Some(poller) = targets_poller.take() {
                        poller.close();
                    }
                    return Ok(());
                }
            }
        }
    }

    async fn do_reconfigure(
        &self,
        targets_poller: &mut Option<RepoPoller>,
        new_state: State,
    ) -> Result<(), WatcherError> {
        let (additions, removals) = {
            let current = self.state.lock();
            diff_targets(&current.targets, &new_state.targets)
        };

        *self.state.lock() = new_state.clone();

        if let Some(old) = targets_poller.take() {
            old.close();
        }

        let repos = new_state.targets.iter().map(repository_for_target).collect();
        let mut poller = RepoPoller::new(
            repos,
            self.poll_interval,
            self.directory.clone(),
            self.auth.clone(),
            PollerKind::Targets,
        );

        let init_result = (&mut poller.initial_done)
            .await
            .map_err(|_| WatcherError::PollerDied)?;
        init_result?;
        *targets_poller = Some(poller);

        tracing::debug!(removals = removals.len(), additions = additions.len(), "reconfiguring watcher");

        for target in removals {
            self.push_task(&new_state, target, true).await?;
        }
        for target in additions {
            self.push_task(&new_state, target, false).await?;
        }

        Ok(())
    }

    async fn push_task(&self, state: &State, target: Target, shutdown: bool) -> Result<(), WatcherError> {
        let path = target.working_dir(&self.directory);
        self.bus
            .send(ExecutionTask {
                target,
                path,
                shutdown,
                env: state.env.clone(),
            })
            .await
            .map_err(|_| WatcherError::BusClosed)
    }
}

async fn poll_targets(poller: &mut Option<RepoPoller>) -> PollerEvent {
    match poller {
        Some(p) => {
            tokio::select! {
                Some(event) = p.events.recv() => PollerEvent::Commit(event),
                Some(err) = p.errors.recv() => PollerEvent::Error(err),
                else => std::future::pending().await,
            }
        }
        None => std::future::pending().await,
    }
}

fn repository_for_target(target: &Target) -> Repository {
    let directory = match &target.branch {
        Some(branch) => format!("{}_{}", target.name, branch),
        None => target.name.clone(),
    };
    let mut repo = Repository::new(target.url.clone(), directory);
    if let Some(branch) = &target.branch {
        repo = repo.with_branch(branch.clone());
    }
    repo
}

#[cfg(test)]
mod tests {
    use super::*;
    use tend_core::test_support::{StateBuilder, TargetBuilder};

    fn init_bare_repo_with_commit(dir: &std::path::Path) {
        let repo = git2::Repository::init(dir).expect("init");
        let sig = git2::Signature::now("tend", "tend@example.com").expect("sig");
        let tree_id = repo.index().expect("index").write_tree().expect("write tree");
        let tree = repo.find_tree(tree_id).expect("find tree");
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .expect("commit");
    }

    #[tokio::test]
    async fn handle_errors_for_unknown_target() {
        let (bus_tx, _bus_rx) = mpsc::channel(4);
        let watcher = Watcher::new(PathBuf::from("."), Duration::from_secs(3600), GitAuth::None, bus_tx);

        let event = CommitEvent {
            url: "https://example.com/unknown.git".to_string(),
            path: PathBuf::from("."),
            oid: "deadbeef".to_string(),
            timestamp: std::time::SystemTime::now(),
        };

        let result = watcher.handle(event).await;
        assert!(matches!(result, Err(WatcherError::UnknownTarget(_))));
    }

    #[tokio::test]
    async fn initial_configure_pushes_addition_for_every_target() {
        let upstream = tempfile::tempdir().expect("tempdir");
        init_bare_repo_with_commit(upstream.path());
        let cache = tempfile::tempdir().expect("tempdir");

        let (bus_tx, mut bus_rx) = mpsc::channel(4);
        let watcher = std::sync::Arc::new(Watcher::new(
            cache.path().to_path_buf(),
            Duration::from_secs(3600),
            GitAuth::None,
            bus_tx,
        ));

        let target = TargetBuilder::new("svc")
            .url(format!("file://{}", upstream.path().display()))
            .up(&["true"])
            .build();
        let state = StateBuilder::new().target(target).build();

        let loop_watcher = std::sync::Arc::clone(&watcher);
        let shutdown = CancellationToken::new();
        let loop_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move { loop_watcher.start(loop_shutdown).await });

        watcher.set_state(state).await.expect("set_state");

        let task = bus_rx.recv().await.expect("expected an execution task");
        assert_eq!(task.target.name, "svc");
        assert!(!task.shutdown);

        shutdown.cancel();
        let _ = handle.await;
    }
}
