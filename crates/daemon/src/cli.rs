// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tendd", version, about = "tend - a GitOps workload-sync daemon")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sync workloads against the state declared in a configuration repository.
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// URL of the configuration repository to poll.
    pub config_repo_url: String,

    #[arg(long, env = "TEND_GIT_USERNAME")]
    pub git_username: Option<String>,

    #[arg(long, env = "TEND_GIT_PASSWORD")]
    pub git_password: Option<String>,

    #[arg(long, env = "TEND_HOSTNAME")]
    pub hostname: Option<String>,

    #[arg(long, env = "TEND_DIRECTORY", default_value = "./cache/")]
    pub directory: PathBuf,

    /// Inherit the daemon's own process environment into every child command.
    #[arg(long, env = "TEND_PASS_ENV")]
    pub pass_env: bool,

    /// Authenticate git traffic via the local ssh-agent instead of HTTP basic auth.
    #[arg(long, env = "TEND_SSH")]
    pub ssh: bool,

    #[arg(long, env = "TEND_CHECK_INTERVAL", default_value = "10s", value_parser = parse_duration)]
    pub check_interval: Duration,

    #[arg(long, env = "TEND_VAULT_ADDR")]
    pub vault_addr: Option<String>,

    #[arg(long, env = "TEND_VAULT_TOKEN")]
    pub vault_token: Option<String>,

    #[arg(long, env = "TEND_VAULT_PATH", default_value = "/secret")]
    pub vault_path: String,

    #[arg(long, env = "TEND_VAULT_RENEW_INTERVAL", default_value = "24h", value_parser = parse_duration)]
    pub vault_renew_interval: Duration,

    #[arg(long, env = "TEND_VAULT_CONFIG_PATH", default_value = "pico")]
    pub vault_config_path: String,
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime::parse_duration(raw).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation_with_defaults() {
        let cli = Cli::parse_from(["tendd", "run", "https://example.com/config.git"]);
        let Command::Run(args) = cli.command;
        assert_eq!(args.config_repo_url, "https://example.com/config.git");
        assert_eq!(args.directory, PathBuf::from("./cache/"));
        assert_eq!(args.check_interval, Duration::from_secs(10));
        assert_eq!(args.vault_path, "/secret");
        assert_eq!(args.vault_renew_interval, Duration::from_secs(24 * 60 * 60));
        assert_eq!(args.vault_config_path, "pico");
        assert!(!args.pass_env);
        assert!(!args.ssh);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "tendd",
            "run",
            "https://example.com/config.git",
            "--ssh",
            "--pass-env",
            "--check-interval",
            "30s",
            "--vault-addr",
            "https://vault.example.com",
        ]);
        let Command::Run(args) = cli.command;
        assert!(args.ssh);
        assert!(args.pass_env);
        assert_eq!(args.check_interval, Duration::from_secs(30));
        assert_eq!(args.vault_addr.as_deref(), Some("https://vault.example.com"));
    }
}
