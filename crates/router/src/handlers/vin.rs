// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VIN tracking.
//!
//! Remembers the vehicle identification number reported by the host and,
//! once the device is activated, re-announces it on the device's own cloud
//! topic so the backend can associate vehicle and device.

use crate::registry::{EventProcessor, HandlerError};
use ignite_core::store::keys;
use ignite_core::{Clock, Event, EventEmitter, KvStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DUMMY_VIN: &str = "NA";
const VIN_TOPIC_SUFFIX: &str = "/2c/dvp";

/// Handler for the `vinHandler` domain.
pub struct VinHandler {
    store: Arc<dyn KvStore>,
    emitter: Arc<dyn EventEmitter>,
    clock: Arc<dyn Clock>,
    topic_prefix: String,
}

impl VinHandler {
    pub fn new(
        store: Arc<dyn KvStore>,
        emitter: Arc<dyn EventEmitter>,
        clock: Arc<dyn Clock>,
        topic_prefix: &str,
    ) -> Self {
        Self { store, emitter, clock, topic_prefix: topic_prefix.to_string() }
    }

    fn handle_vin_event(&self, event: &Event) -> Result<(), HandlerError> {
        // Topiced VIN events are this handler's own re-announcements coming
        // back around; processing them again would loop.
        if !event.get_string("topic").is_empty() {
            debug!("ignoring already-topiced VIN event");
            return Ok(());
        }

        let mut vin = event.get_string("value");
        if vin.is_empty() {
            vin = DUMMY_VIN.to_string();
        }

        match self.store.get(keys::LAST_DEVICE_ID) {
            Some(device_id) if !device_id.is_empty() => {
                info!("device already activated, re-announcing VIN");
                self.send_topiced_vin(&vin, &device_id);
            }
            _ => debug!("device not activated yet"),
        }

        self.store
            .set(keys::VIN, &vin)
            .map_err(|error| HandlerError::Failed(error.to_string()))
    }

    fn handle_activation_event(&self, event: &Event) {
        match self.store.get(keys::VIN).filter(|vin| !vin.is_empty()) {
            Some(vin) => {
                let device_id = event.get_string("id");
                self.send_topiced_vin(&vin, &device_id);
            }
            None => warn!("VIN not yet received"),
        }
    }

    fn send_topiced_vin(&self, vin: &str, device_id: &str) {
        let topic = format!("{}{}{}", self.topic_prefix, device_id, VIN_TOPIC_SUFFIX);
        self.emitter.emit(
            Event::new("1.0", "VIN")
                .at(self.clock.epoch_ms(), 0)
                .with_field("value", vin)
                .with_field("dummy", vin == DUMMY_VIN)
                .with_field("topic", topic.as_str()),
        );
    }
}

impl EventProcessor for VinHandler {
    fn process_event(&self, event: &Event) -> Result<(), HandlerError> {
        match event.event_id.as_str() {
            "VIN" => self.handle_vin_event(event),
            "ActivationEvent" => {
                self.handle_activation_event(event);
                Ok(())
            }
            other => {
                debug!(event_id = other, "not supported");
                Ok(())
            }
        }
    }

    fn apply_config(&self, _notif: &Value) -> Result<(), HandlerError> {
        Ok(())
    }

    fn reset(&self) {}
}

#[cfg(test)]
#[path = "vin_tests.rs"]
mod tests;
