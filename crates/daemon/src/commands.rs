// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge from typed IPC commands to the agent's subsystems.

use crate::lifecycle::{ExitRequest, Lifecycle};
use ignite_auth::ActivationState;
use ignite_core::store::keys;
use ignite_core::{EventEmitter, ExitType, KvStore};
use ignite_ipc::{DeviceCommandHandler, ListenerShutdown, MessageDispatcher, MessageOut};
use ignite_storage::EventJournal;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Live MQTT connection state, updated by the MQTT transport collaborator.
#[derive(Default)]
pub struct MqttStatus {
    connected: AtomicBool,
}

impl MqttStatus {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Agent-side implementation of the host command surface.
pub struct CommandBridge {
    pub lifecycle: Arc<Lifecycle>,
    pub activation_state: Arc<ActivationState>,
    pub journal: Arc<EventJournal>,
    pub db_size_limit: u64,
    pub mqtt: Arc<MqttStatus>,
    pub emitter: Arc<dyn EventEmitter>,
    pub ipc_shutdown: ListenerShutdown,
    pub dispatcher: Arc<MessageDispatcher>,
    pub store: Arc<dyn KvStore>,
}

impl DeviceCommandHandler for CommandBridge {
    fn prepare_for_shutdown(&self, timeout_s: u64, exit_on_complete: bool, exit_type: ExitType) {
        info!(timeout_s, exit_on_complete, ?exit_type, "prepare-for-shutdown received");

        let lifecycle = Arc::clone(&self.lifecycle);
        let ipc_shutdown = self.ipc_shutdown.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            lifecycle.notify_shutdown();
            ipc_shutdown.shutdown_notify().await;

            let clean = lifecycle.wait_all_ready(Duration::from_secs(timeout_s)).await;
            if !clean {
                warn!("receivers missed the grace period");
            }
            if let Err(error) = store.set(keys::IC_RUNNING_STATUS, "shutdown") {
                warn!(%error, "could not persist running status");
            }

            let ack = json!({ "state": "READY", "clean": clean });
            if !dispatcher.dispatch(MessageOut::ShutdownNotifAck, &ack).await {
                error!("shutdown ack not delivered");
            }

            if exit_on_complete {
                lifecycle.request_exit(ExitRequest { exit_type, code: 0 });
            }
        });
    }

    fn shutdown_initiated(&self) {
        info!("shutdown initiated by host");
        if let Err(error) = self.store.set(keys::IC_RUNNING_STATUS, "shutdown") {
            warn!(%error, "could not persist running status");
        }
        self.lifecycle.notify_shutdown();

        let ipc_shutdown = self.ipc_shutdown.clone();
        let lifecycle = Arc::clone(&self.lifecycle);
        tokio::spawn(async move {
            ipc_shutdown.shutdown_notify().await;
            lifecycle.request_exit(ExitRequest { exit_type: ExitType::Quick, code: 0 });
        });
    }

    fn activation_details(&self) -> Value {
        let (status, reason) = self.activation_state.activation_state();
        json!({ "status": status, "reason": reason as i32 })
    }

    fn db_size(&self) -> Value {
        json!({ "size": self.journal.size_bytes(), "limit": self.db_size_limit })
    }

    fn mqtt_status(&self) -> Value {
        json!({ "connected": self.mqtt.is_connected() })
    }

    fn remote_operation_response(&self, payload: &str) {
        // The host's response travels the normal upload path as an event.
        match ignite_core::Event::from_json(payload) {
            Ok(event) => self.emitter.emit(event),
            Err(error) => error!(%error, "bad remote operation response payload"),
        }
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
