// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use tend_executor::{ExecutorBus, ExecutorConfig};
use tend_reconfigurer::Reconfigurer;
use tend_secret::{MemoryStore, SecretStore, VaultStore};
use tend_watcher::Watcher;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::auth::resolve_git_auth;
use crate::cli::RunArgs;

const BUS_CAPACITY: usize = 64;

/// Wires the secret store, git auth, executor, watcher, and reconfigurer
/// together and runs them until shutdown, per spec §4.7.
pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let secret_store = build_secret_store(&args).await?;
    let git_auth = resolve_git_auth(&args, secret_store.as_ref()).await;
    let hostname = args.hostname.clone().unwrap_or_default();
    let process_env: BTreeMap<String, String> = std::env::vars().collect();

    let (bus_tx, bus_rx) = mpsc::channel(BUS_CAPACITY);
    let watcher = Arc::new(Watcher::new(
        args.directory.clone(),
        args.check_interval,
        git_auth.clone(),
        bus_tx,
    ));
    let executor = ExecutorBus::new(
        Arc::clone(&secret_store),
        ExecutorConfig {
            pass_environment: args.pass_env,
            ..ExecutorConfig::default()
        },
    );
    let reconfigurer = Reconfigurer::new(
        args.config_repo_url.clone(),
        hostname,
        args.directory.clone(),
        args.check_interval,
        git_auth,
        process_env,
    );

    let shutdown = CancellationToken::new();
    spawn_signal_handlers(shutdown.clone());

    let executor_handle = tokio::spawn(async move { executor.subscribe(bus_rx).await });

    let watcher_handle = {
        let watcher = Arc::clone(&watcher);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = watcher.start(shutdown.clone()).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "watcher activity failed");
                shutdown.cancel();
            }
            result
        })
    };

    let reconfigurer_handle = {
        let watcher = Arc::clone(&watcher);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = reconfigurer.configure(&watcher, shutdown.clone()).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "reconfigurer activity failed");
                shutdown.cancel();
            }
            result
        })
    };

    let renew_handle = secret_store.supports_renew().then(|| {
        let renew_store = Arc::clone(&secret_store);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = renew_store.renew(shutdown.clone()).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "secret renewal activity failed");
                shutdown.cancel();
            }
            result
        })
    });

    let watcher_result = watcher_handle.await.context("watcher task panicked")?;
    let reconfigurer_result = reconfigurer_handle.await.context("reconfigurer task panicked")?;
    let renew_result = match renew_handle {
        Some(handle) => Some(handle.await.context("secret renewal task panicked")?),
        None => None,
    };

    // Dropping the last Arc<Watcher> drops its bus sender, letting the
    // executor's receive loop end so it can be joined.
    drop(watcher);
    executor_handle.await.context("executor task panicked")?;

    watcher_result?;
    reconfigurer_result?;
    if let Some(result) = renew_result {
        result?;
    }

    Ok(())
}

async fn build_secret_store(args: &RunArgs) -> anyhow::Result<Arc<dyn SecretStore>> {
    match &args.vault_addr {
        Some(addr) => {
            let token = args.vault_token.clone().unwrap_or_default();
            let store = VaultStore::connect(addr, &args.vault_path, &token, args.vault_renew_interval)
                .await
                .context("failed to connect to the configured secret store")?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

fn spawn_signal_handlers(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGINT handler");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        }
        shutdown.cancel();
    });
}
