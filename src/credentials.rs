//! Access token resolution from the process environment or a private `.env`.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

/// Name of the variable (and `.env` key) holding the bearer token.
pub const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";

/// Long-lived bearer token for the platform API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

impl AccessToken {
    /// Wrap a raw token. Blank values are rejected.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// The raw token, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

/// Resolve the access token.
///
/// The environment value wins. Otherwise the `ACCESS_TOKEN` key of
/// `env_file` is used when that file exists and is private. Any problem with
/// the file is logged and treated as "no token".
pub fn resolve_access_token<F>(lookup: F, env_file: &Path) -> Option<AccessToken>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup(ACCESS_TOKEN_VAR).and_then(AccessToken::new) {
        return Some(token);
    }

    if !env_file.exists() {
        return None;
    }

    match read_env_file_token(env_file) {
        Ok(Some(token)) => {
            debug!(path = %env_file.display(), "access token loaded from env file");
            Some(token)
        }
        Ok(None) => None,
        Err(e) => {
            warn!(path = %env_file.display(), error = %e, "ignoring env file");
            None
        }
    }
}

/// Read the `ACCESS_TOKEN` entry from a `.env` file.
///
/// # Errors
///
/// Returns an error if the file is readable by group or others, or cannot
/// be parsed.
pub fn read_env_file_token(path: &Path) -> anyhow::Result<Option<AccessToken>> {
    validate_private_permissions(path)?;

    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    for item in iter {
        let (key, value) =
            item.with_context(|| format!("failed to parse entry in {}", path.display()))?;
        if key == ACCESS_TOKEN_VAR {
            return Ok(AccessToken::new(value));
        }
    }

    Ok(None)
}

#[cfg(unix)]
fn validate_private_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata =
        fs::metadata(path).with_context(|| format!("failed to inspect {}", path.display()))?;
    let mode = metadata.permissions().mode() & 0o777;

    anyhow::ensure!(
        mode & 0o077 == 0,
        "env file {} must be 0600, found {:o}",
        path.display(),
        mode
    );
    Ok(())
}

#[cfg(not(unix))]
fn validate_private_permissions(path: &Path) -> anyhow::Result<()> {
    fs::metadata(path).with_context(|| format!("failed to inspect {}", path.display()))?;
    Ok(())
}
