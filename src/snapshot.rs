//! Entity state snapshots.
//!
//! Each run archives the full state collection, verbatim, into a new
//! `entities_<timestamp>.json`. Archiving is best-effort: an absent fetch
//! produces an empty snapshot and a storage failure is logged, never raised.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::artifacts::{artifact_path, write_once};
use crate::gateway::{GatewayClient, Transport};
use crate::model::STATES_PATH;

/// File name prefix for snapshot artifacts.
pub const SNAPSHOT_PREFIX: &str = "entities";

/// A written snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Artifact path.
    pub path: PathBuf,
    /// Capture time, also encoded in the file name.
    pub captured_at: DateTime<Utc>,
    /// Number of entities archived.
    pub entity_count: usize,
}

/// Fetch all entity states and archive them under `snapshots_dir`.
///
/// Returns `None` only when the artifact could not be written.
pub async fn capture<T: Transport>(
    gateway: &GatewayClient<T>,
    snapshots_dir: &Path,
) -> Option<Snapshot> {
    let entities = match gateway.get(STATES_PATH).await {
        Some(Value::Array(items)) => items,
        Some(_) => {
            warn!("states payload is not an array; archiving an empty snapshot");
            Vec::new()
        }
        None => Vec::new(),
    };

    let captured_at = Utc::now();
    let path = artifact_path(snapshots_dir, SNAPSHOT_PREFIX, captured_at, "json");

    match write_snapshot(&path, &entities).await {
        Ok(()) => {
            info!(path = %path.display(), entities = entities.len(), "snapshot saved");
            Some(Snapshot {
                path,
                captured_at,
                entity_count: entities.len(),
            })
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "snapshot not written");
            None
        }
    }
}

async fn write_snapshot(path: &Path, entities: &[Value]) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(entities).context("failed to serialize snapshot")?;
    write_once(path, &json).await
}
