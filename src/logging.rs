//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! Every event is appended as one plain-text, timestamp-prefixed line to
//! `{logs_dir}/agent.log` and mirrored to stderr. The log file is never
//! rotated or truncated; it is the only state that outlives a run.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LOG_FILE_NAME;

/// Holds the non-blocking writer guard for file logging.
///
/// The [`WorkerGuard`] must be kept alive for the duration of the process.
/// Dropping it flushes pending log lines and closes the file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Initialise logging for a run.
///
/// Creates `logs_dir` if needed and opens the log file in append mode.
/// Verbosity follows `RUST_LOG` (default: `info`).
///
/// # Errors
///
/// Returns an error if the directory or file cannot be opened, or if a
/// global subscriber is already installed.
pub fn init(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(logs_dir)
        .with_context(|| format!("failed to open {LOG_FILE_NAME} in {}", logs_dir.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(non_blocking);

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("failed to install global tracing subscriber")?;

    Ok(LoggingGuard { _guard: guard })
}
