// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn payload_fields_land_in_the_event_envelope() {
    let raw = MessageOut::ActivationDetails
        .envelope(&json!({"status": true, "reason": 0}), 1_700_000_000_000.0);
    let event = Event::from_json(&raw).unwrap();
    assert_eq!(event.event_id, "ActivationStatus");
    assert_eq!(event.data["status"], json!(true));
    assert_eq!(event.data["reason"], json!(0));
    assert_eq!(event.timestamp, Some(1_700_000_000_000.0));
}

#[test]
fn remote_operation_payload_passes_through_unwrapped() {
    let payload = json!({"EventID": "RemoteOperationEngine", "Data": {"state": "STARTED"}});
    let raw = MessageOut::RemoteOperationMessage.envelope(&payload, 1.0);
    assert_eq!(serde_json::from_str::<Value>(&raw).unwrap(), payload);
}

#[test]
fn event_ids_match_the_host_contract() {
    assert_eq!(MessageOut::DbSize.event_id(), "DBSize");
    assert_eq!(MessageOut::MqttConnectionStatus.event_id(), "MQTTConnectionStatus");
    assert_eq!(MessageOut::ShutdownNotifAck.event_id(), "DeviceShutdownNotifAck");
    assert_eq!(MessageOut::IcStatus.event_id(), "ICRunningStatus");
}

#[test]
fn only_running_status_broadcasts() {
    assert!(MessageOut::IcStatus.is_broadcast());
    assert!(!MessageOut::ActivationDetails.is_broadcast());
    assert!(!MessageOut::RemoteOperationMessage.is_broadcast());
}
