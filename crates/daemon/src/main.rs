// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tendd: a GitOps workload-sync daemon.
//!
//! Polls a configuration repository for a declared list of targets, keeps
//! each target's own repository checked out and up to date, and runs the
//! target's `up`/`down` commands as targets appear, change, or disappear.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod auth;
mod cli;
mod logging;
mod supervisor;

use clap::Parser;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => supervisor::run(args).await,
    }
}
