// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The message router.
//!
//! Inbound messages are either event payloads (run through the transport
//! pipeline, then fanned out to domain handlers) or domain notifications
//! (applied as configuration to the addressed handler). Parse failures stay
//! here: the offending message is logged and dropped.

use crate::domain_map::DomainEventMap;
use crate::pipeline::TransportPipeline;
use crate::registry::HandlerRegistry;
use ignite_core::Event;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// What producers and the cloud hand to the router.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// Serialized event record.
    Event(String),
    /// Serialized `{"domain": ..., "notif": {...}}` document.
    Notification(String),
}

type ConfigCallback = Box<dyn Fn(&Value) + Send + Sync>;

/// Routes inbound traffic to domain handlers via the transport pipeline.
pub struct MessageRouter {
    registry: Arc<HandlerRegistry>,
    map: Mutex<DomainEventMap>,
    pipeline: TransportPipeline,
    config_subscribers: Mutex<HashMap<String, ConfigCallback>>,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        map: DomainEventMap,
        pipeline: TransportPipeline,
    ) -> Self {
        Self {
            registry,
            map: Mutex::new(map),
            pipeline,
            config_subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Entry point for all inbound traffic.
    pub fn notify(&self, message: InboundMessage) {
        match message {
            InboundMessage::Event(raw) => match Event::from_json(&raw) {
                Ok(event) => self.route_event(event),
                Err(error) => error!(%error, "unparseable event payload"),
            },
            InboundMessage::Notification(raw) => self.route_notification(&raw),
        }
    }

    /// Run an already-built event through the pipeline and dispatch it.
    pub fn route_event(&self, event: Event) {
        debug!(event_id = %event.event_id, "processing event");
        for delivered in self.pipeline.run(event) {
            let domains = self.map.lock().domains_for(&delivered.event_id);
            if domains.is_empty() {
                debug!(event_id = %delivered.event_id, "no domain subscribed");
                continue;
            }
            for domain in domains {
                // Handler failures are isolated per domain inside dispatch.
                self.registry.dispatch_event(&domain, &delivered);
            }
        }
    }

    fn route_notification(&self, raw: &str) {
        let parsed: Value = match serde_json::from_str(raw) {
            Ok(parsed) => parsed,
            Err(error) => {
                error!(%error, "invalid notification payload");
                return;
            }
        };

        let (Some(domain), Some(notif)) = (
            parsed.get("domain").and_then(Value::as_str),
            parsed.get("notif").filter(|v| v.is_object()),
        ) else {
            error!("notification missing domain or notif object");
            return;
        };

        info!(domain, "processing notification");
        match self.registry.notif_handler(domain) {
            Some(handler) => {
                if let Err(error) = handler.apply_config(notif) {
                    error!(domain, %error, "notification handler failed");
                }
            }
            None => info!(domain, "no notification handler"),
        }

        if let Some(callback) = self.config_subscribers.lock().get(domain) {
            callback(notif);
        }
    }

    /// Register a callback for configuration notifications on a domain.
    pub fn subscribe_config_updates(
        &self,
        domain: &str,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) {
        self.config_subscribers.lock().insert(domain.to_string(), Box::new(callback));
    }

    pub fn unsubscribe_config_updates(&self, domain: &str) {
        self.config_subscribers.lock().remove(domain);
    }

    /// Atomically swap in a new domain → events configuration.
    pub fn apply_domain_event_map(&self, new_map: &Value) {
        self.map.lock().apply_update(new_map);
    }

    /// Domains currently subscribed to an event id.
    pub fn domains_for(&self, event_id: &str) -> Vec<String> {
        self.map.lock().domains_for(event_id)
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
