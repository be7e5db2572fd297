//! Homewarden: periodic health-check and remediation agent for Home Assistant.
//!
//! Each invocation snapshots every entity state, diagnoses disabled
//! automations and unloaded integrations, applies bounded corrective actions
//! through the REST API, logs performance advice, and writes a run report.
//! Every network failure is absorbed at the gateway boundary; only a missing
//! access token stops a run.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Configuration loading and validation.
pub mod config;
/// Access token resolution.
pub mod credentials;
/// Structured logging to the append-only agent log.
pub mod logging;

/// Authenticated HTTP gateway to the platform API.
pub mod gateway;
/// Entity and integration types decoded from API payloads.
pub mod model;

/// Optimization advice derived from entity attributes.
pub mod advisor;
/// Write-once, timestamp-named artifact files.
pub mod artifacts;
/// Device, entity, and integration collection.
pub mod diagnostics;
/// Run sequencing and the credential gate.
pub mod orchestrator;
/// Corrective actions for anomalous automations and integrations.
pub mod remediation;
/// Run report files.
pub mod report;
/// Entity state snapshots.
pub mod snapshot;
