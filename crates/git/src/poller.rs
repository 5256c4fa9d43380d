// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::auth::GitAuth;
use crate::error::{PollError, PollerInitError};
use crate::repository::{CommitEvent, Repository};

const CHANNEL_CAPACITY: usize = 16;

/// Whether a repository failing to clone on the poller's first round is
/// fatal. The daemon's single configuration-repository poller uses
/// [`PollerKind::Config`]; the per-target poller uses [`PollerKind::Targets`]
/// and simply retries on the next tick (see DESIGN.md for the reasoning).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerKind {
    Config,
    Targets,
}

/// Polls a fixed set of git repositories, emitting a [`CommitEvent`] on
/// [`RepoPoller::events`] whenever a repository's `HEAD` moves.
pub struct RepoPoller {
    pub events: mpsc::Receiver<CommitEvent>,
    pub errors: mpsc::Receiver<PollError>,
    pub initial_done: oneshot::Receiver<Result<(), PollerInitError>>,
    handle: JoinHandle<()>,
}

impl RepoPoller {
    pub fn new(
        repos: Vec<Repository>,
        poll_interval: Duration,
        cache_root: PathBuf,
        auth: GitAuth,
        kind: PollerKind,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (initial_tx, initial_rx) = oneshot::channel();

        let handle = tokio::spawn(run(
            repos,
            poll_interval,
            cache_root,
            auth,
            kind,
            events_tx,
            errors_tx,
            initial_tx,
        ));

        Self {
            events: events_rx,
            errors: errors_rx,
            initial_done: initial_rx,
            handle,
        }
    }

    /// Stops the background poll loop. No further events are emitted after
    /// this returns.
    pub fn close(self) {
        self.handle.abort();
    }
}

async fn run(
    repos: Vec<Repository>,
    poll_interval: Duration,
    cache_root: PathBuf,
    auth: GitAuth,
    kind: PollerKind,
    events: mpsc::Sender<CommitEvent>,
    errors: mpsc::Sender<PollError>,
    initial_done: oneshot::Sender<Result<(), PollerInitError>>,
) {
    let mut last_seen: HashMap<String, String> = HashMap::new();

    match poll_round(&repos, &cache_root, &auth, &events, &errors, &mut last_seen, true, kind).await
    {
        Ok(()) => {
            let _ = initial_done.send(Ok(()));
        }
        Err(e) => {
            let _ = initial_done.send(Err(e));
            return;
        }
    }

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.tick().await; // the first tick fires immediately; we already polled above

    loop {
        ticker.tick().await;
        // subsequent rounds are never fatal, regardless of kind
        let _ = poll_round(
            &repos, &cache_root, &auth, &events, &errors, &mut last_seen, false, kind,
        )
        .await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn poll_round(
    repos: &[Repository],
    cache_root: &Path,
    auth: &GitAuth,
    events: &mpsc::Sender<CommitEvent>,
    errors: &mpsc::Sender<PollError>,
    last_seen: &mut HashMap<String, String>,
    first_round: bool,
    kind: PollerKind,
) -> Result<(), PollerInitError> {
    for repo in repos {
        let dir = cache_root.join(&repo.directory);
        let url = repo.url.clone();
        let branch = repo.branch.clone();
        let auth = auth.clone();

        let result = tokio::task::spawn_blocking(move || sync_repo(dir, url, branch, auth)).await;

        let result = match result {
            Ok(inner) => inner,
            Err(join_error) => Err(join_error.to_string()),
        };

        match result {
            Ok((path, oid)) => {
                let changed = last_seen.get(&repo.url).map(|prev| prev != &oid).unwrap_or(true);
                if changed {
                    last_seen.insert(repo.url.clone(), oid.clone());
                    let _ = events
                        .send(CommitEvent {
                            url: repo.url.clone(),
                            path,
                            oid,
                            timestamp: SystemTime::now(),
                        })
                        .await;
                }
            }
            Err(message) => {
                if first_round && kind == PollerKind::Config {
                    return Err(PollerInitError::new(repo.url.clone(), message));
                }
                let _ = errors.send(PollError::new(repo.url.clone(), message)).await;
            }
        }
    }
    Ok(())
}

fn sync_repo(
    dir: PathBuf,
    url: String,
    branch: Option<String>,
    auth: GitAuth,
) -> Result<(PathBuf, String), String> {
    let repo = if dir.join(".git").exists() {
        git2::Repository::open(&dir).map_err(|e| e.to_string())?
    } else {
        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        git2::Repository::init(&dir).map_err(|e| e.to_string())?
    };

    let mut remote = repo
        .find_remote("origin")
        .or_else(|_| repo.remote("origin", &url))
        .map_err(|e| e.to_string())?;

    let branch_ref = resolve_branch_ref(&mut remote, branch.as_deref(), &auth)?;
    let short_name = branch_ref.trim_start_matches("refs/heads/");

    let mut fetch_opts = git2::FetchOptions::new();
    fetch_opts.remote_callbacks(auth.callbacks());
    let refspec = format!("+{branch_ref}:refs/remotes/origin/{short_name}");
    remote
        .fetch(&[refspec.as_str()], Some(&mut fetch_opts), None)
        .map_err(|e| e.to_string())?;

    let fetch_head = repo.find_reference("FETCH_HEAD").map_err(|e| e.to_string())?;
    let oid = fetch_head
        .target()
        .ok_or_else(|| "FETCH_HEAD has no target".to_string())?;

    let object = repo.find_object(oid, None).map_err(|e| e.to_string())?;
    repo.reset(&object, git2::ResetType::Hard, None)
        .map_err(|e| e.to_string())?;

    Ok((dir, oid.to_string()))
}

fn resolve_branch_ref(
    remote: &mut git2::Remote,
    branch: Option<&str>,
    auth: &GitAuth,
) -> Result<String, String> {
    if let Some(b) = branch {
        return Ok(format!("refs/heads/{b}"));
    }
    let connection = remote
        .connect_auth(git2::Direction::Fetch, Some(auth.callbacks()), None)
        .map_err(|e| e.to_string())?;
    let default = connection.default_branch().map_err(|e| e.to_string())?;
    default
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| "remote default branch name is not utf-8".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn init_bare_repo_with_commit(dir: &std::path::Path) -> git2::Oid {
        let repo = git2::Repository::init(dir).expect("init");
        let sig = git2::Signature::now("tend", "tend@example.com").expect("sig");
        let tree_id = repo.index().expect("index").write_tree().expect("write tree");
        let tree = repo.find_tree(tree_id).expect("find tree");
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .expect("commit")
    }

    #[tokio::test]
    async fn clones_and_emits_initial_event_per_repo() {
        let upstream_dir = tempfile::tempdir().expect("tempdir");
        init_bare_repo_with_commit(upstream_dir.path());

        let cache_root = tempfile::tempdir().expect("tempdir");
        let repo = Repository::new(
            format!("file://{}", upstream_dir.path().display()),
            "svc".to_string(),
        )
        .with_branch("master");

        let mut poller = RepoPoller::new(
            vec![repo],
            StdDuration::from_secs(3600),
            cache_root.path().to_path_buf(),
            GitAuth::None,
            PollerKind::Targets,
        );

        let init_result = poller.initial_done.await.expect("initial_done sender dropped");
        assert!(init_result.is_ok());

        let event = poller.events.recv().await.expect("expected one commit event");
        assert_eq!(event.url, format!("file://{}", upstream_dir.path().display()));

        poller.handle.abort();
    }

    #[tokio::test]
    async fn config_kind_fails_fast_on_unreachable_repo() {
        let cache_root = tempfile::tempdir().expect("tempdir");
        let repo = Repository::new("file:///nonexistent/repo/path", "config");

        let poller = RepoPoller::new(
            vec![repo],
            StdDuration::from_secs(3600),
            cache_root.path().to_path_buf(),
            GitAuth::None,
            PollerKind::Config,
        );

        let init_result = poller.initial_done.await.expect("initial_done sender dropped");
        assert!(init_result.is_err());
    }
}
