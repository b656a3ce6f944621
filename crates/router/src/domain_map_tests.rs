// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}

#[test]
fn builds_inverse_from_scalar_and_array_entries() {
    let map = DomainEventMap::from_config(&json!({
        "RemoteOperation": ["RemoteOperationRequest", "RemoteOperationResponse"],
        "vinHandler": "VIN"
    }));

    assert_eq!(map.domains_for("VIN"), vec!["vinHandler"]);
    assert_eq!(map.domains_for("RemoteOperationRequest"), vec!["RemoteOperation"]);
    assert!(map.domains_for("Unknown").is_empty());
    assert!(map.is_inverse_consistent());
}

#[test]
fn shared_event_maps_to_multiple_domains() {
    let map = DomainEventMap::from_config(&json!({
        "activationBackOff": "IgnStatus",
        "sessionTracker": ["IgnStatus", "RPM"]
    }));
    assert_eq!(
        sorted(map.domains_for("IgnStatus")),
        vec!["activationBackOff".to_string(), "sessionTracker".to_string()]
    );
}

#[test]
fn hot_swap_diffs_each_shape_combination() {
    // Spec scenario: {D1: [E1, E2], D2: "E3"} -> {D1: "E1", D2: ["E3", "E4"]}
    let mut map = DomainEventMap::from_config(&json!({
        "D1": ["E1", "E2"],
        "D2": "E3"
    }));

    map.apply_update(&json!({ "D1": "E1", "D2": ["E3", "E4"] }));

    assert_eq!(map.domains_for("E1"), vec!["D1"]);
    assert!(map.domains_for("E2").is_empty(), "E2 removed entirely");
    assert_eq!(map.domains_for("E3"), vec!["D2"]);
    assert_eq!(map.domains_for("E4"), vec!["D2"]);
    assert!(map.is_inverse_consistent());
}

#[test]
fn array_to_array_swap_applies_set_difference() {
    let mut map = DomainEventMap::from_config(&json!({ "D1": ["E1", "E2", "E3"] }));
    map.apply_update(&json!({ "D1": ["E2", "E4"] }));

    assert!(map.domains_for("E1").is_empty());
    assert_eq!(map.domains_for("E2"), vec!["D1"]);
    assert!(map.domains_for("E3").is_empty());
    assert_eq!(map.domains_for("E4"), vec!["D1"]);
}

#[test]
fn swap_preserves_other_domains_references() {
    let mut map = DomainEventMap::from_config(&json!({
        "D1": "E1",
        "D2": "E1"
    }));
    map.apply_update(&json!({ "D1": "E9" }));

    assert_eq!(map.domains_for("E1"), vec!["D2"], "D2's reference must survive");
    assert_eq!(map.domains_for("E9"), vec!["D1"]);
}

#[test]
fn apply_update_is_idempotent() {
    let original = json!({ "D1": ["E1", "E2"], "D2": "E3" });
    let mut map = DomainEventMap::from_config(&original);
    let before = sorted(map.event_ids());

    map.apply_update(&original);
    map.apply_update(&original);

    assert_eq!(sorted(map.event_ids()), before);
    assert!(map.is_inverse_consistent());
}

#[test]
fn unknown_and_missing_domains_are_left_alone() {
    let mut map = DomainEventMap::from_config(&json!({ "D1": "E1" }));
    map.apply_update(&json!({ "D9": "E9" }));

    assert_eq!(map.domains_for("E1"), vec!["D1"], "missing domain untouched");
    assert!(map.domains_for("E9").is_empty(), "new domain not added dynamically");
    assert!(!map.has_domain("D9"));
}
