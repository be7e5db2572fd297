//! Tests for action selection and per-item independence in `src/remediation.rs`.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::FakeTransport;
use homewarden::gateway::{ApiMethod, GatewayError};
use homewarden::model::{EntityState, IntegrationEntry};
use homewarden::remediation::{plan, remediate, validate_entry_id, RemediationAction};

const TURN_OFF: &str = "services/automation/turn_off";

fn automation(entity_id: &str, state: &str) -> EntityState {
    serde_json::from_value(json!({ "entity_id": entity_id, "state": state })).expect("decode")
}

fn entry(entry_id: &str, state: &str) -> IntegrationEntry {
    IntegrationEntry {
        entry_id: entry_id.to_owned(),
        state: state.to_owned(),
        domain: None,
        title: None,
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[test]
fn plan_targets_only_anomalous_items() {
    let actions = plan(
        &[
            automation("automation.a", "off"),
            automation("automation.b", "on"),
            automation("automation.c", "unavailable"),
        ],
        &[entry("1", "setup_error"), entry("2", "loaded"), entry("3", "not_loaded")],
    );

    assert_eq!(
        actions,
        vec![
            RemediationAction::TurnOffAutomation { entity_id: "automation.a".to_owned() },
            RemediationAction::TurnOffAutomation { entity_id: "automation.c".to_owned() },
            RemediationAction::ReloadEntry { entry_id: "1".to_owned() },
            RemediationAction::ReloadEntry { entry_id: "3".to_owned() },
        ]
    );
}

#[test]
fn plan_is_empty_when_everything_is_healthy() {
    let actions = plan(&[automation("automation.a", "on")], &[entry("1", "loaded")]);
    assert!(actions.is_empty());
}

#[test]
fn entry_ids_are_validated_before_use_in_paths() {
    assert!(validate_entry_id("01J9ZK3ABCDEF").is_ok());
    assert!(validate_entry_id("a1b2_c3-d4").is_ok());
    assert!(validate_entry_id("").is_err());
    assert!(validate_entry_id("../../core/restart").is_err());
    assert!(validate_entry_id("abc?x=1").is_err());
    assert!(validate_entry_id("abc def").is_err());
}

#[test]
fn plan_skips_entries_with_unsafe_ids() {
    let actions = plan(&[], &[entry("../restart", "setup_error")]);
    assert!(actions.is_empty());
}

#[test]
fn actions_map_to_api_requests() {
    let turn_off = RemediationAction::TurnOffAutomation { entity_id: "automation.a".to_owned() }
        .to_request();
    assert_eq!(turn_off.method, ApiMethod::Post);
    assert_eq!(turn_off.path, TURN_OFF);
    assert_eq!(turn_off.body, Some(json!({ "entity_id": "automation.a" })));

    let reload = RemediationAction::ReloadEntry { entry_id: "1".to_owned() }.to_request();
    assert_eq!(reload.method, ApiMethod::Post);
    assert_eq!(reload.path, "config/config_entries/entry/1/reload");
    assert_eq!(reload.body, None);
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_single_disabled_automation() {
    let fake = Arc::new(FakeTransport::new().on_post(TURN_OFF, Ok(json!([]))));
    let gateway = common::single_attempt_gateway(&fake);

    let outcome = remediate(
        &gateway,
        &[automation("automation.a", "off"), automation("automation.b", "on")],
        &[],
    )
    .await;

    let posts = fake.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].path, TURN_OFF);
    assert_eq!(posts[0].body, Some(json!({ "entity_id": "automation.a" })));
    assert_eq!(outcome.automations_fixed, 1);
    assert_eq!(outcome.entries_reloaded, 0);
}

#[tokio::test]
async fn scenario_single_failed_integration() {
    let fake = Arc::new(
        FakeTransport::new().on_post("config/config_entries/entry/1/reload", Ok(json!({}))),
    );
    let gateway = common::single_attempt_gateway(&fake);

    let outcome = remediate(
        &gateway,
        &[],
        &[entry("1", "setup_error"), entry("2", "loaded")],
    )
    .await;

    let posts = fake.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].path, "config/config_entries/entry/1/reload");
    assert_eq!(outcome.entries_reloaded, 1);
    assert_eq!(outcome.automations_fixed, 0);
}

#[tokio::test]
async fn one_failure_does_not_stop_the_rest() {
    // First turn-off fails, the next two succeed.
    let fake = Arc::new(
        FakeTransport::new()
            .on_post(TURN_OFF, Err(GatewayError::HttpStatus { status: 500, body: String::new() }))
            .on_post(TURN_OFF, Ok(json!([])))
            .on_post("config/config_entries/entry/e2/reload", Ok(json!({}))),
    );
    let gateway = common::single_attempt_gateway(&fake);

    let outcome = remediate(
        &gateway,
        &[
            automation("automation.a", "off"),
            automation("automation.b", "off"),
            automation("automation.c", "off"),
        ],
        &[entry("e1", "setup_error"), entry("e2", "not_loaded")],
    )
    .await;

    assert_eq!(fake.count(ApiMethod::Post, TURN_OFF), 3);
    assert_eq!(outcome.automations_attempted, 3);
    assert_eq!(outcome.automations_fixed, 2);
    // e1 has no scripted route and answers 404.
    assert_eq!(outcome.entries_attempted, 2);
    assert_eq!(outcome.entries_reloaded, 1);
}

#[tokio::test]
async fn compliant_items_issue_no_calls() {
    let fake = Arc::new(FakeTransport::new());
    let gateway = common::single_attempt_gateway(&fake);

    let outcome = remediate(
        &gateway,
        &[automation("automation.a", "on")],
        &[entry("1", "loaded")],
    )
    .await;

    assert!(fake.calls().is_empty());
    assert_eq!(outcome, Default::default());
}
