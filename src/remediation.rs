//! Corrective actions for anomalous automations and integration entries.
//!
//! Actions come from a closed allowlist ([`RemediationAction`]). Every
//! anomalous item is attempted exactly once per run, in order, and a failure
//! on one item never stops the others. The platform treats both actions as
//! idempotent, so nothing is rolled back.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::gateway::{ApiRequest, GatewayClient, Transport};
use crate::model::{entry_reload_path, EntityState, IntegrationEntry, AUTOMATION_TURN_OFF_PATH};

/// Allowlist of corrective actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    /// Turn off an automation that is not `on`.
    TurnOffAutomation {
        /// Target automation.
        entity_id: String,
    },
    /// Reload an integration entry that is not `loaded`.
    ReloadEntry {
        /// Target entry.
        entry_id: String,
    },
}

impl RemediationAction {
    /// The API call that performs this action.
    pub fn to_request(&self) -> ApiRequest {
        match self {
            Self::TurnOffAutomation { entity_id } => ApiRequest::post(
                AUTOMATION_TURN_OFF_PATH,
                Some(json!({ "entity_id": entity_id })),
            ),
            Self::ReloadEntry { entry_id } => ApiRequest::post(entry_reload_path(entry_id), None),
        }
    }
}

/// Counts from one remediation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemediationOutcome {
    /// Turn-off calls issued.
    pub automations_attempted: usize,
    /// Turn-off calls that returned a result.
    pub automations_fixed: usize,
    /// Reload calls issued.
    pub entries_attempted: usize,
    /// Reload calls that returned a result.
    pub entries_reloaded: usize,
}

/// Validate an entry id before it is placed in a URL path.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted.
///
/// # Errors
///
/// Returns an error if the id is empty or contains any other character.
pub fn validate_entry_id(entry_id: &str) -> anyhow::Result<()> {
    anyhow::ensure!(!entry_id.is_empty(), "entry id must not be empty");
    anyhow::ensure!(
        entry_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        "entry id contains disallowed characters: {entry_id:?}"
    );
    Ok(())
}

/// Select the actions for the given items.
///
/// Automations not `on` get a turn-off; entries not `loaded` get a reload.
/// Compliant items and entries with unsafe ids produce nothing.
pub fn plan(automations: &[EntityState], entries: &[IntegrationEntry]) -> Vec<RemediationAction> {
    let turn_offs = automations
        .iter()
        .filter(|a| a.is_anomalous_automation())
        .map(|a| RemediationAction::TurnOffAutomation {
            entity_id: a.entity_id.clone(),
        });

    let reloads = entries
        .iter()
        .filter(|e| e.is_anomalous())
        .filter(|e| match validate_entry_id(&e.entry_id) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, state = %e.state, "skipping integration entry");
                false
            }
        })
        .map(|e| RemediationAction::ReloadEntry {
            entry_id: e.entry_id.clone(),
        });

    turn_offs.chain(reloads).collect()
}

/// Apply corrective actions and count the calls that succeeded.
pub async fn remediate<T: Transport>(
    gateway: &GatewayClient<T>,
    automations: &[EntityState],
    entries: &[IntegrationEntry],
) -> RemediationOutcome {
    let mut outcome = RemediationOutcome::default();

    for action in plan(automations, entries) {
        let request = action.to_request();
        let succeeded = gateway.post(&request.path, request.body).await.is_some();

        match &action {
            RemediationAction::TurnOffAutomation { entity_id } => {
                outcome.automations_attempted = outcome.automations_attempted.saturating_add(1);
                if succeeded {
                    outcome.automations_fixed = outcome.automations_fixed.saturating_add(1);
                    debug!(entity_id = %entity_id, "automation turned off");
                }
            }
            RemediationAction::ReloadEntry { entry_id } => {
                outcome.entries_attempted = outcome.entries_attempted.saturating_add(1);
                if succeeded {
                    outcome.entries_reloaded = outcome.entries_reloaded.saturating_add(1);
                    debug!(entry_id = %entry_id, "integration entry reloaded");
                }
            }
        }
    }

    info!(
        automations_fixed = outcome.automations_fixed,
        automations_attempted = outcome.automations_attempted,
        "anomalous automations turned off"
    );
    info!(
        entries_reloaded = outcome.entries_reloaded,
        entries_attempted = outcome.entries_attempted,
        "integration entries reloaded"
    );

    outcome
}
