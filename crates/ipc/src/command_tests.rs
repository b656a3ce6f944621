// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn shutdown_prepare_decodes_all_fields() {
    let raw = r#"{
        "EventID": "DeviceShutdownNotif",
        "Timestamp": 1635853382039, "Timezone": 330, "Version": "1.0",
        "Data": {"state": 1, "exitOnComplete": true, "exitType": 2, "timeout": 60}
    }"#;
    assert_eq!(
        Command::parse(raw).unwrap(),
        Command::ShutdownNotif {
            state: ShutdownState::Prepare,
            exit_on_complete: true,
            exit_type: ExitType::Normal,
            timeout_s: 60,
        }
    );
}

#[test]
fn shutdown_initiated_needs_no_timeout() {
    let raw = r#"{"EventID": "DeviceShutdownNotif", "Data": {"state": 2}}"#;
    assert_eq!(
        Command::parse(raw).unwrap(),
        Command::ShutdownNotif {
            state: ShutdownState::Initiated,
            exit_on_complete: false,
            exit_type: ExitType::Quick,
            timeout_s: 0,
        }
    );
}

#[test]
fn shutdown_prepare_without_timeout_is_invalid() {
    let raw = r#"{"EventID": "DeviceShutdownNotif", "Data": {"state": 1}}"#;
    assert!(matches!(Command::parse(raw), Err(CommandError::InvalidPayload(_))));
}

#[test]
fn shutdown_with_unknown_state_is_invalid() {
    let raw = r#"{"EventID": "DeviceShutdownNotif", "Data": {"state": 7, "timeout": 5}}"#;
    assert!(matches!(Command::parse(raw), Err(CommandError::InvalidPayload(_))));
}

#[test]
fn unknown_exit_type_falls_back_to_quick() {
    let raw = r#"{"EventID": "DeviceShutdownNotif",
                  "Data": {"state": 1, "exitOnComplete": true, "exitType": 9, "timeout": 5}}"#;
    match Command::parse(raw).unwrap() {
        Command::ShutdownNotif { exit_type, .. } => assert_eq!(exit_type, ExitType::Quick),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn queries_decode_by_event_id() {
    assert_eq!(
        Command::parse(r#"{"EventID": "ActivationStatusQuery"}"#).unwrap(),
        Command::ActivationStatusQuery
    );
    assert_eq!(Command::parse(r#"{"EventID": "DBSizeQuery"}"#).unwrap(), Command::DbSizeQuery);
    assert_eq!(
        Command::parse(r#"{"EventID": "MQTTConnectionStatusQuery"}"#).unwrap(),
        Command::MqttStatusQuery
    );
}

#[test]
fn remote_operation_response_keeps_the_raw_payload() {
    let raw = r#"{"EventID": "RemoteOperationResponse", "Data": {"response": "SUCCESS"}}"#;
    match Command::parse(raw).unwrap() {
        Command::RemoteOperationResponse { payload } => assert_eq!(payload, raw),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn unknown_commands_are_reported_by_name() {
    match Command::parse(r#"{"EventID": "MakeCoffee"}"#) {
        Err(CommandError::Unknown(name)) => assert_eq!(name, "MakeCoffee"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn garbage_fails_to_parse() {
    assert!(matches!(Command::parse("{nope"), Err(CommandError::Parse(_))));
    assert!(matches!(Command::parse(r#"{"Data": {}}"#), Err(CommandError::InvalidPayload(_))));
}
