// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// How a [`crate::RepoPoller`] authenticates outbound clone/fetch traffic.
///
/// `SshAgent` defers entirely to the local ssh-agent (spec §9's precedence:
/// agent first, then the bootstrap `GIT_USERNAME`/`GIT_PASSWORD` secret).
#[derive(Debug, Clone)]
pub enum GitAuth {
    None,
    UserPass { username: String, password: String },
    SshAgent { username: String },
}

impl GitAuth {
    pub(crate) fn callbacks(&self) -> git2::RemoteCallbacks<'static> {
        let auth = self.clone();
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, allowed| {
            match &auth {
                GitAuth::None => Err(git2::Error::from_str("no credentials configured")),
                GitAuth::UserPass { username, password } => {
                    git2::Cred::userpass_plaintext(username, password)
                }
                GitAuth::SshAgent { username } => {
                    if allowed.contains(git2::CredentialType::SSH_KEY) {
                        let user = username_from_url.unwrap_or(username);
                        git2::Cred::ssh_key_from_agent(user)
                    } else {
                        Err(git2::Error::from_str("ssh agent auth not allowed for this remote"))
                    }
                }
            }
        });
        callbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_auth_rejects_any_credential_request() {
        let auth = GitAuth::None;
        let mut callbacks = auth.callbacks();
        // git2::RemoteCallbacks doesn't expose a way to invoke the closure
        // directly without a live remote; this simply checks construction
        // doesn't panic for every variant.
        let _ = &mut callbacks;
    }
}
