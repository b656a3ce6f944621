// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event record exchanged between producers, the router, and the cloud.
//!
//! Wire shape: `{"EventID": ..., "Version": ..., "Timestamp": ms,
//! "Timezone": minutes, "Data": {...}}` with optional `MessageId`,
//! `BizTransactionId` and `CorrelationId`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from parsing or building an event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("event parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("event has an empty EventID")]
    EmptyEventId,
}

/// A timestamped domain event.
///
/// `timestamp` is epoch milliseconds carried as a double, matching what
/// producers put on the wire. A missing timestamp parses as `None` and is
/// the transport pipeline's problem, not a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "EventID")]
    pub event_id: String,

    #[serde(rename = "Version", default = "default_version")]
    pub version: String,

    #[serde(rename = "Timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    /// Minutes from UTC, signed.
    #[serde(rename = "Timezone", default)]
    pub timezone: i32,

    #[serde(rename = "Data", default = "empty_object")]
    pub data: Value,

    #[serde(rename = "MessageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(rename = "BizTransactionId", default, skip_serializing_if = "Option::is_none")]
    pub biz_transaction_id: Option<String>,

    #[serde(rename = "CorrelationId", default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Event {
    /// Start a new event with an empty data payload.
    pub fn new(version: &str, event_id: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            version: version.to_string(),
            timestamp: None,
            timezone: 0,
            data: empty_object(),
            message_id: None,
            biz_transaction_id: None,
            correlation_id: None,
        }
    }

    /// Stamp the event with a wall-clock time and timezone offset.
    pub fn at(mut self, epoch_ms: f64, timezone_min: i32) -> Self {
        self.timestamp = Some(epoch_ms);
        self.timezone = timezone_min;
        self
    }

    /// Add (or replace) a field in the `Data` payload.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.add_field(key, value);
        self
    }

    pub fn add_field(&mut self, key: &str, value: impl Into<Value>) {
        if let Value::Object(map) = &mut self.data {
            map.insert(key.to_string(), value.into());
        }
    }

    /// Attach a fresh v4 message id.
    pub fn with_message_id(mut self) -> Self {
        self.message_id = Some(uuid::Uuid::new_v4().to_string());
        self
    }

    pub fn with_biz_transaction(mut self, id: &str) -> Self {
        self.biz_transaction_id = Some(id.to_string());
        self
    }

    pub fn with_correlation(mut self, id: &str) -> Self {
        self.correlation_id = Some(id.to_string());
        self
    }

    /// Parse an event from its JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self, EventError> {
        let event: Event = serde_json::from_str(raw)?;
        if event.event_id.is_empty() {
            return Err(EventError::EmptyEventId);
        }
        Ok(event)
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String, EventError> {
        Ok(serde_json::to_string(self)?)
    }

    /// String field from the `Data` payload; empty when absent or non-string.
    pub fn get_string(&self, key: &str) -> String {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Numeric field from the `Data` payload.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(Value::as_i64)
    }
}

/// Sink for synthesized events headed back into the routing pipeline.
///
/// Subsystems below the router (activation state, session synthesis) hold
/// this instead of the router itself.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: Event);
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
