//! Run report files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::artifacts::{artifact_path, write_once};

/// File name prefix for report artifacts.
pub const REPORT_PREFIX: &str = "report";

/// Body of every report: a pointer to the agent log.
pub const REPORT_BODY: &str = "Autonomous agent run finished. See agent.log for details.\n";

/// Write the report for a run started at `run_at`.
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub async fn write_report(reports_dir: &Path, run_at: DateTime<Utc>) -> anyhow::Result<PathBuf> {
    let path = artifact_path(reports_dir, REPORT_PREFIX, run_at, "txt");
    write_once(&path, REPORT_BODY.as_bytes()).await?;
    info!(path = %path.display(), "report written");
    Ok(path)
}
