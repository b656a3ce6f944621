// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain handler registry.
//!
//! Two tables keyed by domain: one for event delivery, one for notification
//! (configuration) delivery. A handler instance may sit in either or both.
//! Handlers live for the whole agent process.

use ignite_core::Event;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure inside a handler. Never crosses to other handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),
}

/// Capability set every domain handler provides.
pub trait EventProcessor: Send + Sync {
    fn process_event(&self, event: &Event) -> Result<(), HandlerError>;

    /// Apply a configuration notification addressed to this domain.
    fn apply_config(&self, notif: &Value) -> Result<(), HandlerError>;

    /// Drop accumulated state.
    fn reset(&self);
}

/// Process-wide domain → handler tables.
#[derive(Default)]
pub struct HandlerRegistry {
    event_handlers: Mutex<HashMap<String, Arc<dyn EventProcessor>>>,
    notif_handlers: Mutex<HashMap<String, Arc<dyn EventProcessor>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register for event delivery. A domain holds at most one handler; the
    /// newcomer wins and the replacement is logged.
    pub fn register_event_handler(&self, domain: &str, handler: Arc<dyn EventProcessor>) {
        if self.event_handlers.lock().insert(domain.to_string(), handler).is_some() {
            warn!(domain, "event handler replaced");
        }
    }

    pub fn register_notif_handler(&self, domain: &str, handler: Arc<dyn EventProcessor>) {
        if self.notif_handlers.lock().insert(domain.to_string(), handler).is_some() {
            warn!(domain, "notification handler replaced");
        }
    }

    pub fn event_handler(&self, domain: &str) -> Option<Arc<dyn EventProcessor>> {
        self.event_handlers.lock().get(domain).cloned()
    }

    pub fn notif_handler(&self, domain: &str) -> Option<Arc<dyn EventProcessor>> {
        self.notif_handlers.lock().get(domain).cloned()
    }

    pub fn has_event_handler(&self, domain: &str) -> bool {
        self.event_handlers.lock().contains_key(domain)
    }

    pub fn event_domains(&self) -> Vec<String> {
        self.event_handlers.lock().keys().cloned().collect()
    }

    /// Deliver an event to one domain's handler, swallowing handler failure.
    pub fn dispatch_event(&self, domain: &str, event: &Event) {
        match self.event_handler(domain) {
            Some(handler) => {
                if let Err(error) = handler.process_event(event) {
                    warn!(domain, %error, event_id = %event.event_id, "handler failed");
                }
            }
            None => debug!(domain, "no processor found"),
        }
    }

    /// Reset every registered handler (both tables, each instance once per
    /// table it appears in).
    pub fn reset_all(&self) {
        for handler in self.event_handlers.lock().values() {
            handler.reset();
        }
        for handler in self.notif_handlers.lock().values() {
            handler.reset();
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
