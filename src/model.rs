//! Platform types decoded from API payloads, and the endpoint paths used.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// `GET`: full entity state collection.
pub const STATES_PATH: &str = "states";
/// `GET`: device collection (counted only).
pub const DEVICES_PATH: &str = "devices";
/// `GET`: integration config entries.
pub const CONFIG_ENTRIES_PATH: &str = "config/config_entries";
/// `POST`: turn off an automation, body `{"entity_id": ...}`.
pub const AUTOMATION_TURN_OFF_PATH: &str = "services/automation/turn_off";

/// `POST` path that reloads one integration entry.
pub fn entry_reload_path(entry_id: &str) -> String {
    format!("config/config_entries/entry/{entry_id}/reload")
}

/// Entity domain for automation rules.
pub const AUTOMATION_PREFIX: &str = "automation.";
/// Healthy automation state.
pub const AUTOMATION_ON: &str = "on";
/// Healthy integration entry state.
pub const ENTRY_LOADED: &str = "loaded";

/// One entity's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// `<domain>.<object_id>`.
    pub entity_id: String,
    /// Current state value.
    #[serde(default)]
    pub state: String,
    /// Attribute mapping.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    /// The domain part of the entity id, if it has one.
    pub fn domain(&self) -> Option<&str> {
        self.entity_id.split_once('.').map(|(domain, _)| domain)
    }

    /// Whether this entity is an automation rule.
    pub fn is_automation(&self) -> bool {
        self.entity_id.starts_with(AUTOMATION_PREFIX)
    }

    /// Automations are anomalous whenever they are not `on`.
    pub fn is_anomalous_automation(&self) -> bool {
        self.is_automation() && self.state != AUTOMATION_ON
    }

    /// The `scan_interval` attribute, only when it is a JSON integer.
    pub fn scan_interval(&self) -> Option<i64> {
        // Floats and strings are not integers; as_i64 rejects both.
        self.attributes.get("scan_interval")?.as_i64()
    }
}

/// A configured integration instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationEntry {
    /// Opaque entry identifier.
    pub entry_id: String,
    /// Lifecycle state, e.g. `loaded` or `setup_error`.
    #[serde(default)]
    pub state: String,
    /// Integration domain, when reported.
    #[serde(default)]
    pub domain: Option<String>,
    /// Human-readable title, when reported.
    #[serde(default)]
    pub title: Option<String>,
}

impl IntegrationEntry {
    /// Entries are anomalous whenever they are not `loaded`.
    pub fn is_anomalous(&self) -> bool {
        self.state != ENTRY_LOADED
    }
}

/// Decode a fetched collection, tolerating absent and malformed data.
///
/// An absent result or a non-array payload yields an empty list.
/// Elements that fail to decode are skipped with a warning.
pub fn decode_list<T: DeserializeOwned>(value: Option<Value>, what: &str) -> Vec<T> {
    let items = match value {
        None => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!(collection = what, kind = json_kind(&other), "expected a JSON array");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(collection = what, index, error = %e, "skipping undecodable item");
                None
            }
        })
        .collect()
}

/// Number of items in a fetched collection; zero when absent or not an array.
pub fn count_items(value: Option<&Value>) -> usize {
    value.and_then(Value::as_array).map_or(0, Vec::len)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
