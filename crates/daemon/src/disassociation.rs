// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Disassociation handling.
//!
//! When the cloud withdraws the device association, stored credentials are
//! cleared, the host is told the device is no longer activated, and the
//! process restarts with the disassociation exit code so the supervisor can
//! bring it back up in the anonymous state.

use crate::commands::MqttStatus;
use crate::lifecycle::{ExitRequest, Lifecycle};
use ignite_auth::{ActivationFailureReason, ActivationState};
use ignite_core::store::keys;
use ignite_core::{Event, ExitCode, ExitType, KvStore};
use ignite_ipc::MessageOut;
use ignite_router::{EventProcessor, HandlerError};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Handler for the `disassociationRequest` domain.
pub struct DisassociationHandler {
    pub store: Arc<dyn KvStore>,
    pub activation_state: Arc<ActivationState>,
    pub lifecycle: Arc<Lifecycle>,
    pub messenger: Arc<crate::emitter::QueuedMessenger>,
    pub mqtt: Arc<MqttStatus>,
}

impl DisassociationHandler {
    fn handle(&self) {
        // Stored credentials go first so the next start activates afresh.
        for key in [keys::LOGIN, keys::PASSCODE, keys::LAST_DEVICE_ID] {
            if let Err(error) = self.store.remove(key) {
                warn!(key, %error, "could not clear credential");
            }
        }
        self.activation_state
            .set_activation_state(false, ActivationFailureReason::Disassociated);

        let payload = json!({
            "status": false,
            "reason": ActivationFailureReason::Disassociated as i32,
        });
        if !self.messenger.send(MessageOut::ActivationDetails, payload) {
            warn!("host not told about disassociation");
        }

        if let Err(error) = self.store.set(keys::DEVICE_DISASSOCIATED, "true") {
            warn!(%error, "could not persist disassociation");
        }
        info!("device is disassociated, restarting");

        self.mqtt.set_connected(false);
        self.lifecycle.request_exit(ExitRequest {
            exit_type: ExitType::Normal,
            code: ExitCode::Disassociation.code(),
        });
    }
}

impl EventProcessor for DisassociationHandler {
    fn process_event(&self, _event: &Event) -> Result<(), HandlerError> {
        self.handle();
        Ok(())
    }

    fn apply_config(&self, _notif: &Value) -> Result<(), HandlerError> {
        self.handle();
        Ok(())
    }

    fn reset(&self) {}
}

#[cfg(test)]
#[path = "disassociation_tests.rs"]
mod tests;
