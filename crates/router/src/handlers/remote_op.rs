// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote operation forwarding.
//!
//! Remote-operation requests arrive from the cloud through the router; this
//! handler stamps the device's response topic into the payload and hands it
//! to the host over the local message channel. The host's response comes
//! back as a `RemoteOperationResponse` command on the IPC ingress and goes
//! straight to the upload path.

use crate::registry::{EventProcessor, HandlerError};
use ignite_core::store::keys;
use ignite_core::{Event, KvStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const RO_TOPIC_SUFFIX: &str = "/2c/ro";

/// Narrow view of the outbound device channel this handler needs.
pub trait DeviceMessenger: Send + Sync {
    /// Deliver a remote-operation payload to the host. `false` when the
    /// channel rejected it.
    fn deliver_remote_operation(&self, payload: &str) -> bool;
}

/// Handler for the `RemoteOperation` domain.
pub struct RemoteOperationHandler {
    store: Arc<dyn KvStore>,
    messenger: Arc<dyn DeviceMessenger>,
    topic_prefix: String,
}

impl RemoteOperationHandler {
    pub fn new(
        store: Arc<dyn KvStore>,
        messenger: Arc<dyn DeviceMessenger>,
        topic_prefix: &str,
    ) -> Self {
        Self { store, messenger, topic_prefix: topic_prefix.to_string() }
    }

    fn response_topic(&self) -> String {
        let device_id = self.store.get(keys::LAST_DEVICE_ID).unwrap_or_default();
        format!("{}{}{}", self.topic_prefix, device_id, RO_TOPIC_SUFFIX)
    }
}

impl EventProcessor for RemoteOperationHandler {
    fn process_event(&self, event: &Event) -> Result<(), HandlerError> {
        let mut message = event.clone();
        message.add_field("topic", self.response_topic().as_str());

        let payload =
            message.to_json().map_err(|error| HandlerError::Failed(error.to_string()))?;
        if self.messenger.deliver_remote_operation(&payload) {
            debug!(event_id = %event.event_id, "remote operation forwarded to host");
            Ok(())
        } else {
            warn!(event_id = %event.event_id, "host channel rejected remote operation");
            Err(HandlerError::Failed("device channel rejected message".to_string()))
        }
    }

    fn apply_config(&self, _notif: &Value) -> Result<(), HandlerError> {
        Ok(())
    }

    fn reset(&self) {}
}

#[cfg(test)]
#[path = "remote_op_tests.rs"]
mod tests;
