//! Access tokens for remote git hosts
//!
//! Tokens never reach an argument vector. They are handed to git through
//! `GIT_CONFIG_COUNT` / `GIT_CONFIG_KEY_n` / `GIT_CONFIG_VALUE_n`, which
//! rewrite `https://<host>/` to an authenticated URL for that one process.

use std::collections::HashMap;

use crate::error::{BridgeError, ErrorCode};

const TOKEN_ENV_PREFIX: &str = "CMDBRIDGE_TOKEN_";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Cannot determine host of remote '{0}'")]
    UnknownHost(String),

    #[error("Token for host '{host}' contains characters that cannot be used in a URL")]
    InvalidToken { host: String },
}

impl From<CredentialError> for BridgeError {
    fn from(err: CredentialError) -> Self {
        let (code, host) = match &err {
            CredentialError::UnknownHost(_) => (ErrorCode::CREDENTIAL_INVALID_HOST, None),
            CredentialError::InvalidToken { host } => {
                (ErrorCode::CREDENTIAL_GENERIC, Some(host.clone()))
            }
        };
        BridgeError::credential_with_code(code, err.to_string(), host).with_source(err)
    }
}

/// Resolves an access token for a remote host
pub trait CredentialProvider: Send + Sync {
    fn token_for_host(&self, host: &str) -> Option<String>;
}

/// Never supplies a token
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn token_for_host(&self, _host: &str) -> Option<String> {
        None
    }
}

/// Tokens from the `[credentials]` config table, overridden by
/// `CMDBRIDGE_TOKEN_<HOST>` environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfiguredCredentials {
    tokens: HashMap<String, String>,
    read_env: bool,
}

impl ConfiguredCredentials {
    pub fn new(tokens: &HashMap<String, String>) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|(host, token)| (host.to_ascii_lowercase(), token.clone()))
                .collect(),
            read_env: true,
        }
    }

    /// Ignore the process environment
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }
}

impl CredentialProvider for ConfiguredCredentials {
    fn token_for_host(&self, host: &str) -> Option<String> {
        if self.read_env {
            if let Ok(token) = std::env::var(token_env_var(host)) {
                if !token.is_empty() {
                    return Some(token);
                }
            }
        }
        self.tokens.get(&host.to_ascii_lowercase()).cloned()
    }
}

/// `github.com` -> `CMDBRIDGE_TOKEN_GITHUB_COM`
pub fn token_env_var(host: &str) -> String {
    let suffix: String = host
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{TOKEN_ENV_PREFIX}{suffix}")
}

/// Host of an `https://`, `http://`, `ssh://` or scp-style (`git@host:path`) URL
pub fn host_from_url(url: &str) -> Option<String> {
    let url = url.trim();
    let rest = match url.split_once("://") {
        Some((_, rest)) => rest,
        None => {
            // scp-style: [user@]host:path
            let (authority, _) = url.split_once(':')?;
            if authority.contains('/') {
                return None;
            }
            authority
        }
    };

    let authority = rest.split('/').next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = host_port.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

fn is_https(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

/// Environment that makes git authenticate to `host` with `token`.
///
/// Both `https://host/` and `git@host:` remotes are rewritten to the
/// authenticated https form. Terminal prompts are disabled so a rejected
/// token fails instead of waiting for input.
pub fn git_token_env(host: &str, token: &str) -> Result<Vec<(String, String)>, CredentialError> {
    if token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '@' | '/' | ':'))
    {
        return Err(CredentialError::InvalidToken {
            host: host.to_string(),
        });
    }

    let authenticated = format!("url.https://x-access-token:{token}@{host}/.insteadOf");
    let rewrites = [format!("https://{host}/"), format!("git@{host}:")];

    let mut env = vec![("GIT_CONFIG_COUNT".to_string(), rewrites.len().to_string())];
    for (i, original) in rewrites.iter().enumerate() {
        env.push((format!("GIT_CONFIG_KEY_{i}"), authenticated.clone()));
        env.push((format!("GIT_CONFIG_VALUE_{i}"), original.clone()));
    }
    env.push(("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()));
    Ok(env)
}

/// Token environment for a remote URL, empty when no token is configured
pub fn credential_env_for_url(
    provider: &dyn CredentialProvider,
    url: &str,
) -> Result<Vec<(String, String)>, CredentialError> {
    let host = host_from_url(url).ok_or_else(|| CredentialError::UnknownHost(url.to_string()))?;
    match provider.token_for_host(&host) {
        Some(token) if is_https(url) || url.contains('@') => {
            tracing::debug!("Injecting credentials for host {}", host);
            git_token_env(&host, &token)
        }
        Some(_) => {
            tracing::debug!("Remote {} does not use https; token not injected", url);
            Ok(Vec::new())
        }
        None => Ok(Vec::new()),
    }
}
