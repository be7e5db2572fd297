//! Device, entity, and integration collection.

use tracing::info;

use crate::gateway::{GatewayClient, Transport};
use crate::model::{
    count_items, decode_list, EntityState, IntegrationEntry, CONFIG_ENTRIES_PATH, DEVICES_PATH,
    STATES_PATH,
};

/// What one diagnostic pass found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnosis {
    /// Number of devices reported.
    pub device_count: usize,
    /// Number of entity states fetched, including any that failed to decode.
    pub entity_count: usize,
    /// Number of config entries fetched, including any that failed to decode.
    pub entry_count: usize,
    /// Every entity state.
    pub states: Vec<EntityState>,
    /// The subset of `states` in the `automation.` domain, in order.
    pub automations: Vec<EntityState>,
    /// Integration config entries.
    pub entries: Vec<IntegrationEntry>,
}

/// Fetch devices, states, and config entries and classify them.
///
/// The three reads are independent and run concurrently. Each one that
/// fails contributes an empty collection. Counts reflect what the platform
/// returned; items that do not decode are counted but not classified.
pub async fn collect<T: Transport>(gateway: &GatewayClient<T>) -> Diagnosis {
    let (devices, states, entries) = tokio::join!(
        gateway.get(DEVICES_PATH),
        gateway.get(STATES_PATH),
        gateway.get(CONFIG_ENTRIES_PATH),
    );

    let device_count = count_items(devices.as_ref());
    let entity_count = count_items(states.as_ref());
    let entry_count = count_items(entries.as_ref());
    let states: Vec<EntityState> = decode_list(states, "states");
    let entries: Vec<IntegrationEntry> = decode_list(entries, "config_entries");
    let automations: Vec<EntityState> = states
        .iter()
        .filter(|s| s.is_automation())
        .cloned()
        .collect();

    info!(
        devices = device_count,
        entities = entity_count,
        automations = automations.len(),
        integrations = entry_count,
        "diagnosis complete"
    );

    Diagnosis {
        device_count,
        entity_count,
        entry_count,
        states,
        automations,
        entries,
    }
}
