// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tend_git::GitAuth;
use tend_secret::SecretStore;

use crate::cli::RunArgs;

/// Resolves the outbound git credential precedence of spec §9: SSH-agent
/// (when requested), else HTTP basic auth from flags, else HTTP basic auth
/// from the bootstrap secret at `--vault-config-path`, else no auth at all.
pub async fn resolve_git_auth(args: &RunArgs, store: &dyn SecretStore) -> GitAuth {
    if args.ssh {
        let username = args.git_username.clone().unwrap_or_default();
        return GitAuth::SshAgent { username };
    }

    if let (Some(username), Some(password)) = (&args.git_username, &args.git_password) {
        return GitAuth::UserPass {
            username: username.clone(),
            password: password.clone(),
        };
    }

    match store.secrets_for(&args.vault_config_path).await {
        Ok(bootstrap) => {
            match (bootstrap.get("GIT_USERNAME"), bootstrap.get("GIT_PASSWORD")) {
                (Some(username), Some(password)) => GitAuth::UserPass {
                    username: username.clone(),
                    password: password.clone(),
                },
                _ => GitAuth::None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read bootstrap git credentials, falling back to no auth");
            GitAuth::None
        }
    }
}
