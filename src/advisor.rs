//! Optimization advice derived from entity attributes.
//!
//! Read-only: nothing here takes a gateway, so advice can never change
//! platform state.

use serde::Serialize;
use tracing::info;

use crate::model::EntityState;

/// Fixed dashboard advice logged once per run.
pub const DASHBOARD_HINT: &str =
    "dark theme, custom icons, mini-graph-card and mushroom cards grouped per room";

/// An entity polling faster than the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Entity to reconfigure.
    pub entity_id: String,
    /// Current `scan_interval` in seconds.
    pub scan_interval: i64,
}

/// Flag every entity whose integer `scan_interval` is below `threshold_secs`.
pub fn advise(states: &[EntityState], threshold_secs: i64) -> Vec<Suggestion> {
    let suggestions: Vec<Suggestion> = states
        .iter()
        .filter_map(|s| {
            let interval = s.scan_interval()?;
            (interval < threshold_secs).then(|| Suggestion {
                entity_id: s.entity_id.clone(),
                scan_interval: interval,
            })
        })
        .collect();

    for s in &suggestions {
        info!(
            entity_id = %s.entity_id,
            scan_interval_secs = s.scan_interval,
            threshold_secs,
            "consider increasing scan_interval"
        );
    }
    info!(count = suggestions.len(), "performance suggestions");

    suggestions
}

/// Log the dashboard suggestions.
pub fn dashboard_hints() {
    info!(hint = DASHBOARD_HINT, "dashboard suggestions");
}
