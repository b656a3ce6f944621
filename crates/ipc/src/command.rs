// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed commands ingested from the host.
//!
//! Commands arrive as event-shaped JSON; the `EventID` selects the command
//! and `Data` carries its arguments.

use ignite_core::ExitType;
use serde_json::Value;
use thiserror::Error;

const CMD_SHUTDOWN_NOTIF: &str = "DeviceShutdownNotif";
const CMD_ACTIVATION_STATUS_QUERY: &str = "ActivationStatusQuery";
const CMD_DB_SIZE_QUERY: &str = "DBSizeQuery";
const CMD_MQTT_STATUS_QUERY: &str = "MQTTConnectionStatusQuery";
const CMD_RO_RESPONSE: &str = "RemoteOperationResponse";

/// Errors from command decoding.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("command not supported: {0}")]
    Unknown(String),

    #[error("invalid command payload: {0}")]
    InvalidPayload(&'static str),
}

/// Shutdown phases signalled by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// Wind down within the grace period.
    Prepare = 1,
    /// Power loss is imminent.
    Initiated = 2,
}

/// A decoded host command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ShutdownNotif {
        state: ShutdownState,
        exit_on_complete: bool,
        exit_type: ExitType,
        timeout_s: u64,
    },
    ActivationStatusQuery,
    DbSizeQuery,
    MqttStatusQuery,
    /// Raw event payload to feed into the upload path.
    RemoteOperationResponse { payload: String },
}

impl Command {
    /// Decode a command frame by its `EventID`.
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let parsed: Value = serde_json::from_str(raw)?;
        let event_id = parsed
            .get("EventID")
            .and_then(Value::as_str)
            .ok_or(CommandError::InvalidPayload("EventID missing"))?;

        match event_id {
            CMD_SHUTDOWN_NOTIF => parse_shutdown(&parsed),
            CMD_ACTIVATION_STATUS_QUERY => Ok(Self::ActivationStatusQuery),
            CMD_DB_SIZE_QUERY => Ok(Self::DbSizeQuery),
            CMD_MQTT_STATUS_QUERY => Ok(Self::MqttStatusQuery),
            CMD_RO_RESPONSE => Ok(Self::RemoteOperationResponse { payload: raw.to_string() }),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_shutdown(parsed: &Value) -> Result<Command, CommandError> {
    let data = parsed
        .get("Data")
        .filter(|v| v.is_object())
        .ok_or(CommandError::InvalidPayload("Data missing"))?;

    let state = match data.get("state").and_then(Value::as_i64) {
        Some(1) => ShutdownState::Prepare,
        Some(2) => ShutdownState::Initiated,
        Some(_) => return Err(CommandError::InvalidPayload("unsupported shutdown state")),
        None => return Err(CommandError::InvalidPayload("state attribute missing")),
    };

    // Prepare needs a grace period; initiated shutdown happens now.
    let timeout_s = match data.get("timeout").and_then(Value::as_u64) {
        Some(timeout) => timeout,
        None if state == ShutdownState::Prepare => {
            return Err(CommandError::InvalidPayload("timeout attribute missing"))
        }
        None => 0,
    };

    let exit_on_complete =
        data.get("exitOnComplete").and_then(Value::as_bool).unwrap_or(false);
    let exit_type = data
        .get("exitType")
        .and_then(Value::as_i64)
        .and_then(ExitType::from_wire)
        .unwrap_or(ExitType::Quick);

    Ok(Command::ShutdownNotif { state, exit_on_complete, exit_type, timeout_s })
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
