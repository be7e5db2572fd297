//! Configuration loading for the agent.
//!
//! Settings come from an optional `homewarden.toml` plus a handful of
//! environment variables. Every TOML section uses `#[serde(default)]` so a
//! missing or empty file is valid.
//!
//! Resolution never fails: an unreadable file or an out-of-range value is
//! logged and replaced by its default, so the credential check always runs.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::credentials::{resolve_access_token, AccessToken};

/// Environment variable overriding the API base URL.
pub const BASE_URL_VAR: &str = "HASS_URL";
/// Environment variable overriding the agent's base directory.
pub const BASE_DIR_VAR: &str = "HOMEWARDEN_DIR";
/// Environment variable pointing at an explicit TOML config file.
pub const CONFIG_PATH_VAR: &str = "HOMEWARDEN_CONFIG";

/// Base directory used when `HOMEWARDEN_DIR` is unset.
pub const DEFAULT_BASE_DIR: &str = "/config/ha_autonomous_agent";
/// Config file looked up inside the base directory.
pub const CONFIG_FILE_NAME: &str = "homewarden.toml";
/// Name of the append-only log file inside the logs directory.
pub const LOG_FILE_NAME: &str = "agent.log";

/// Contents of `homewarden.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Platform API connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Optimization advisor settings.
    #[serde(default)]
    pub advisor: AdvisorConfig,
}

/// Platform API connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the platform, without the `/api` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retry behaviour for failed calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded retry with exponential backoff.
///
/// Off by default: each call is attempted once. Raising `max_attempts`
/// retries timeouts, transport errors, 429 and 5xx.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any single delay, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Optimization advisor settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    /// `scan_interval` values strictly below this many seconds get flagged.
    #[serde(default = "default_scan_interval_threshold_secs")]
    pub scan_interval_threshold_secs: i64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            scan_interval_threshold_secs: default_scan_interval_threshold_secs(),
        }
    }
}

/// Resolved filesystem layout under the agent's base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPaths {
    /// Base directory owned by the agent.
    pub root: PathBuf,

    /// Directory holding the append-only log.
    pub logs_dir: PathBuf,

    /// The append-only log file.
    pub log_file: PathBuf,

    /// Directory for entity snapshots.
    pub snapshots_dir: PathBuf,

    /// Directory for run reports.
    pub reports_dir: PathBuf,

    /// Optional private `.env` holding the access token.
    pub env_file: PathBuf,
}

impl AgentPaths {
    /// Lay out all paths under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let logs_dir = root.join("logs");
        let log_file = logs_dir.join(LOG_FILE_NAME);
        Self {
            snapshots_dir: root.join("backups"),
            reports_dir: root.join("reports"),
            env_file: root.join(".env"),
            logs_dir,
            log_file,
            root,
        }
    }

    /// Resolve the base directory from `HOMEWARDEN_DIR`, falling back to
    /// [`DEFAULT_BASE_DIR`].
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = lookup(BASE_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_BASE_DIR), PathBuf::from);
        Self::new(root)
    }

    /// Create the snapshot and report directories. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [&self.snapshots_dir, &self.reports_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Effective configuration for one run.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Bearer token; `None` aborts the run.
    pub access_token: Option<AccessToken>,

    /// Platform API connection settings.
    pub api: ApiConfig,

    /// Optimization advisor settings.
    pub advisor: AdvisorConfig,

    /// Filesystem layout.
    pub paths: AgentPaths,
}

impl AgentConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// A config file that cannot be loaded is ignored, and invalid values
    /// fall back to their defaults. Both cases are logged as warnings.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let paths = AgentPaths::resolve(&lookup);

        let file = match read_configured_file(&lookup, &paths) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config file ignored; using defaults");
                FileConfig::default()
            }
        };

        let mut api = file.api;
        if let Some(url) = lookup(BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            api.base_url = url.trim().to_owned();
        }

        Self {
            access_token: resolve_access_token(&lookup, &paths.env_file),
            api: api.or_defaults(),
            advisor: file.advisor.or_defaults(),
            paths,
        }
    }

    /// Validate that configuration values are within sane bounds.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.api.validate()?;
        self.advisor.validate()
    }
}

impl ApiConfig {
    /// Check the connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_base_url(&self.base_url)?;
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "api.request_timeout_secs must be > 0"
        );
        anyhow::ensure!(
            (1..=10).contains(&self.retry.max_attempts),
            "api.retry.max_attempts must be in [1, 10]"
        );
        anyhow::ensure!(
            self.retry.initial_backoff_ms <= self.retry.max_backoff_ms,
            "api.retry.initial_backoff_ms must not exceed max_backoff_ms"
        );
        Ok(())
    }

    /// Replace an unusable base URL with the default, then the remaining
    /// settings if they are still out of bounds.
    fn or_defaults(mut self) -> Self {
        if let Err(e) = validate_base_url(&self.base_url) {
            warn!(error = %format!("{e:#}"), "invalid base URL; using {}", default_base_url());
            self.base_url = default_base_url();
        }
        match self.validate() {
            Ok(()) => self,
            Err(e) => {
                warn!(error = %e, "invalid api settings; using defaults");
                Self {
                    base_url: self.base_url,
                    ..Self::default()
                }
            }
        }
    }
}

impl AdvisorConfig {
    /// Check the advisor settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is not positive.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.scan_interval_threshold_secs > 0,
            "advisor.scan_interval_threshold_secs must be positive"
        );
        Ok(())
    }

    fn or_defaults(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(e) => {
                warn!(error = %e, "invalid advisor settings; using defaults");
                Self::default()
            }
        }
    }
}

/// Check that `base_url` is an absolute `http` or `https` URL.
///
/// # Errors
///
/// Returns an error if the URL does not parse or uses another scheme.
pub fn validate_base_url(base_url: &str) -> anyhow::Result<()> {
    let url = url::Url::parse(base_url)
        .with_context(|| format!("api.base_url is not a valid URL: {base_url}"))?;
    anyhow::ensure!(
        matches!(url.scheme(), "http" | "https"),
        "api.base_url must use http or https: {base_url}"
    );
    Ok(())
}

/// The explicit `HOMEWARDEN_CONFIG` file, else `homewarden.toml` in the base
/// directory when present, else defaults.
fn read_configured_file<F>(lookup: &F, paths: &AgentPaths) -> anyhow::Result<FileConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(explicit) = lookup(CONFIG_PATH_VAR).filter(|v| !v.trim().is_empty()) {
        return load_file_config(Path::new(&explicit));
    }
    let default_path = paths.root.join(CONFIG_FILE_NAME);
    if default_path.exists() {
        load_file_config(&default_path)
    } else {
        Ok(FileConfig::default())
    }
}

/// Load and parse a TOML config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse config at {}", path.display()))
}

// Default value functions for serde.

fn default_base_url() -> String {
    "http://127.0.0.1:8123".to_owned()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_scan_interval_threshold_secs() -> i64 {
    10
}
