// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn sample() -> ConfigSnapshot {
    ConfigSnapshot::new(json!({
        "HCPAuth": {
            "ActivationBackOffConf": { "enable": true, "ignitionThreshold": 75 }
        },
        "DAM": {
            "TimestampValidatorExceptions": ["AppRegistration", "ForceUpload", 7],
            "Database": { "storeInvalidEvents": false }
        },
        "ProductType": "hu"
    }))
}

#[test]
fn dot_paths_walk_nested_objects() {
    let cfg = sample();
    assert!(cfg.get_bool("HCPAuth.ActivationBackOffConf.enable", false));
    assert_eq!(cfg.get_i64("HCPAuth.ActivationBackOffConf.ignitionThreshold", 50), 75);
    assert_eq!(cfg.get_string("ProductType"), "hu");
}

#[test]
fn missing_paths_fall_back_to_defaults() {
    let cfg = sample();
    assert_eq!(cfg.get_i64("HCPAuth.Nope.attempts", 24), 24);
    assert!(cfg.get_bool("Nope", true));
    assert_eq!(cfg.get_string("MQTT.topicprefix"), "");
}

#[test]
fn string_lists_skip_non_strings() {
    let cfg = sample();
    assert_eq!(
        cfg.get_string_list("DAM.TimestampValidatorExceptions"),
        vec!["AppRegistration".to_string(), "ForceUpload".to_string()]
    );
    assert!(cfg.get_string_list("ProductType").is_empty());
}

#[test]
fn shared_config_swaps_whole_snapshots() {
    let shared = SharedConfig::new(sample());
    assert!(!shared.load().get_bool("DAM.Database.storeInvalidEvents", true));
    shared.swap(ConfigSnapshot::new(json!({"DAM": {"Database": {"storeInvalidEvents": true}}})));
    assert!(shared.load().get_bool("DAM.Database.storeInvalidEvents", false));
}
