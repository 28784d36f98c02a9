use std::time::Duration;

use kestrel_api::activity::{Activity, ActivityKind, ActivityMetadata};
use kestrel_api::priority::ActivityPriority;
use serde_json::json;

#[test]
fn test_new_activity_defaults() {
    let activity = Activity::command("agent-1", json!({ "op": "summarize" }));

    assert_eq!(activity.runtime_id, "agent-1");
    assert_eq!(activity.kind, ActivityKind::Command);
    assert_eq!(activity.priority(), ActivityPriority::Normal);
    assert_eq!(activity.timeout(), None);
    assert_eq!(activity.correlation_id(), None);
    assert_eq!(activity.metadata, ActivityMetadata::default());
    assert!(!activity.id.is_empty());
    assert!(activity.timestamp > 0);
}

#[test]
fn test_ids_are_unique_and_sequence_increases() {
    let first = Activity::event("agent-1", json!(null));
    let second = Activity::state_change("agent-1", json!(null));

    assert_ne!(first.id, second.id);
    assert!(second.sequence > first.sequence);
    assert_eq!(second.kind, ActivityKind::StateChange);
}

#[test]
fn test_builders_set_metadata() {
    let activity = Activity::event("agent-2", json!({}))
        .with_id("fixed")
        .with_priority(ActivityPriority::Background)
        .with_timeout(Duration::from_millis(750))
        .with_correlation_id("process-7");

    assert_eq!(activity.id, "fixed");
    assert_eq!(activity.priority(), ActivityPriority::Background);
    assert_eq!(activity.timeout(), Some(Duration::from_millis(750)));
    assert_eq!(activity.correlation_id(), Some("process-7"));
}

#[test]
fn test_json_shape() {
    let activity = Activity::state_change("agent-3", json!({ "field": "title" }))
        .with_priority(ActivityPriority::High)
        .with_timeout(Duration::from_secs(2));
    let value = serde_json::to_value(&activity).unwrap();

    assert_eq!(value["type"], "STATE_CHANGE");
    assert_eq!(value["runtimeId"], "agent-3");
    assert_eq!(value["payload"]["field"], "title");
    assert_eq!(value["metadata"]["priority"], "HIGH");
    assert_eq!(value["metadata"]["timeout"], 2000);
    assert!(value["metadata"].get("correlationId").is_none());
}

#[test]
fn test_parse_without_metadata() {
    let activity: Activity = serde_json::from_value(json!({
        "id": "a-1",
        "runtimeId": "agent-4",
        "type": "EVENT",
        "payload": { "n": 1 },
        "timestamp": 1_700_000_000_000u64,
        "sequence": 9
    }))
    .unwrap();

    assert_eq!(activity.kind, ActivityKind::Event);
    assert_eq!(activity.priority(), ActivityPriority::Normal);
    assert_eq!(activity.timeout(), None);
}
