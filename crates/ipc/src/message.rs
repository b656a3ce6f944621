// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed outbound messages to the host.

use ignite_core::Event;
use serde_json::Value;

/// The messages the agent can deliver to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageOut {
    /// Remote operation request relayed from the cloud; payload is already a
    /// full event document.
    RemoteOperationMessage,
    VinRequestToDevice,
    IcStatus,
    ShutdownNotifAck,
    ActivationDetails,
    DbSize,
    MqttConnectionStatus,
}

impl MessageOut {
    /// `EventID` of the envelope built for this message.
    pub fn event_id(self) -> &'static str {
        match self {
            Self::RemoteOperationMessage => "RemoteOperationMessage",
            Self::VinRequestToDevice => "VINRequest",
            Self::IcStatus => "ICRunningStatus",
            Self::ShutdownNotifAck => "DeviceShutdownNotifAck",
            Self::ActivationDetails => "ActivationStatus",
            Self::DbSize => "DBSize",
            Self::MqttConnectionStatus => "MQTTConnectionStatus",
        }
    }

    /// Broadcast messages fan out to every subscriber; the rest are
    /// point-to-point toward the host command endpoint.
    pub fn is_broadcast(self) -> bool {
        matches!(self, Self::IcStatus)
    }

    /// Wrap a payload's fields into this message's event envelope.
    ///
    /// Remote operation messages pass through untouched: they are already
    /// complete event documents.
    pub fn envelope(self, payload: &Value, epoch_ms: f64) -> String {
        if self == Self::RemoteOperationMessage {
            return payload.to_string();
        }

        let mut event = Event::new("1.0", self.event_id()).at(epoch_ms, 0);
        if let Value::Object(fields) = payload {
            for (name, value) in fields {
                event.add_field(name, value.clone());
            }
        }
        event.to_json().unwrap_or_else(|_| String::from("{}"))
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
