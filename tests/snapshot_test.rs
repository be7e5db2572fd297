//! Tests for `src/snapshot.rs`: verbatim archiving and best-effort behaviour.

mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use common::FakeTransport;
use homewarden::gateway::{ApiMethod, GatewayError};
use homewarden::snapshot::capture;

fn read_json(path: &std::path::Path) -> Value {
    let raw = std::fs::read_to_string(path).expect("snapshot should be readable");
    serde_json::from_str(&raw).expect("snapshot should be JSON")
}

#[tokio::test]
async fn snapshot_archives_states_verbatim() {
    let states = json!([
        {
            "entity_id": "light.sala",
            "state": "on",
            "attributes": { "friendly_name": "Sala de estar", "brightness": 180 },
            "last_changed": "2026-10-18T08:00:00+00:00",
            "context": { "id": "01J", "parent_id": null }
        },
        { "entity_id": "automation.night", "state": "off", "attributes": {} }
    ]);
    let fake = Arc::new(FakeTransport::new().on_get("states", states.clone()));
    let gateway = common::single_attempt_gateway(&fake);
    let dir = tempfile::tempdir().expect("tempdir");

    let snapshot = capture(&gateway, dir.path()).await.expect("snapshot written");

    assert_eq!(snapshot.entity_count, 2);
    assert_eq!(read_json(&snapshot.path), states);
    let raw = std::fs::read_to_string(&snapshot.path).expect("read");
    assert!(raw.contains("Sala de estar"), "non-ASCII text kept as-is");
}

#[tokio::test]
async fn snapshot_name_carries_capture_timestamp() {
    let fake = Arc::new(FakeTransport::new().on_get("states", json!([])));
    let gateway = common::single_attempt_gateway(&fake);
    let dir = tempfile::tempdir().expect("tempdir");

    let snapshot = capture(&gateway, dir.path()).await.expect("snapshot written");

    let name = snapshot
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .expect("file name");
    let expected = format!(
        "entities_{}.json",
        snapshot.captured_at.format("%Y%m%d_%H%M%S_%6f")
    );
    assert_eq!(name, expected);
    assert_eq!(snapshot.path.parent(), Some(dir.path()));
}

#[tokio::test]
async fn failed_fetch_still_writes_empty_snapshot() {
    let fake = Arc::new(FakeTransport::new().respond(ApiMethod::Get, "states", Err(GatewayError::Timeout)));
    let gateway = common::single_attempt_gateway(&fake);
    let dir = tempfile::tempdir().expect("tempdir");

    let snapshot = capture(&gateway, dir.path()).await.expect("snapshot written");

    assert_eq!(snapshot.entity_count, 0);
    assert_eq!(read_json(&snapshot.path), json!([]));
}

#[tokio::test]
async fn non_array_payload_is_archived_as_empty() {
    let fake = Arc::new(FakeTransport::new().on_get("states", json!({ "message": "API running." })));
    let gateway = common::single_attempt_gateway(&fake);
    let dir = tempfile::tempdir().expect("tempdir");

    let snapshot = capture(&gateway, dir.path()).await.expect("snapshot written");

    assert_eq!(read_json(&snapshot.path), json!([]));
}

#[tokio::test]
async fn consecutive_snapshots_never_overwrite() {
    let fake = Arc::new(FakeTransport::new().on_get("states", json!([])));
    let gateway = common::single_attempt_gateway(&fake);
    let dir = tempfile::tempdir().expect("tempdir");

    let first = capture(&gateway, dir.path()).await.expect("first");
    let second = capture(&gateway, dir.path()).await.expect("second");

    assert_ne!(first.path, second.path);
    assert_eq!(std::fs::read_dir(dir.path()).expect("list").count(), 2);
}

#[tokio::test]
async fn unwritable_directory_is_soft_failure() {
    let fake = Arc::new(FakeTransport::new().on_get("states", json!([])));
    let gateway = common::single_attempt_gateway(&fake);
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("does-not-exist");

    assert!(capture(&gateway, &missing).await.is_none());
}
