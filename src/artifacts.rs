//! Write-once, timestamp-named artifact files.
//!
//! File names carry microsecond precision and are opened with
//! `create_new`, so an existing artifact is never overwritten.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;

/// Timestamp format embedded in artifact file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// `<dir>/<prefix>_<timestamp>.<extension>`.
pub fn artifact_path(dir: &Path, prefix: &str, at: DateTime<Utc>, extension: &str) -> PathBuf {
    dir.join(format!("{prefix}_{}.{extension}", at.format(TIMESTAMP_FORMAT)))
}

/// Write `contents` to a new file at `path`.
///
/// # Errors
///
/// Returns an error if the file already exists or cannot be written.
pub async fn write_once(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;

    file.write_all(contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.flush()
        .await
        .with_context(|| format!("failed to flush {}", path.display()))?;

    Ok(())
}
