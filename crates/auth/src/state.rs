// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide activation state.
//!
//! Other subsystems (IPC queries, the backoff machine) read it; the token
//! manager and backoff write it. Changes are announced to the rest of the
//! agent as synthesized events.

use ignite_core::store::keys;
use ignite_core::{Clock, Event, EventEmitter, KvStore};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

const EVENT_ACTIVATION_REQUEST: &str = "ActivationStateRequest";
const EVENT_TOKEN_CHANGED: &str = "TokenChanged";

/// Why the device is not activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFailureReason {
    NoError = 0,
    /// Backoff entered a throttled phase and reset the published state.
    StateReset,
    AuthFailure,
    NetworkFailure,
    Disassociated,
    Unknown,
}

struct StateInner {
    activated: bool,
    reason: ActivationFailureReason,
    token: String,
}

/// Shared record of `(activated, reason)` plus the current token value.
pub struct ActivationState {
    inner: Mutex<StateInner>,
    clock: Arc<dyn Clock>,
    emitter: Mutex<Option<Arc<dyn EventEmitter>>>,
}

impl ActivationState {
    /// Seed the state from persisted credentials.
    pub fn new(store: &dyn KvStore, clock: Arc<dyn Clock>) -> Self {
        let activated = store.get(keys::LOGIN).is_some_and(|v| !v.is_empty())
            && store.get(keys::PASSCODE).is_some_and(|v| !v.is_empty());
        Self {
            inner: Mutex::new(StateInner {
                activated,
                reason: ActivationFailureReason::NoError,
                token: String::new(),
            }),
            clock,
            emitter: Mutex::new(None),
        }
    }

    /// Wire the event sink once the router exists.
    pub fn set_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.emitter.lock() = Some(emitter);
    }

    pub fn is_activated(&self) -> bool {
        self.inner.lock().activated
    }

    pub fn activation_state(&self) -> (bool, ActivationFailureReason) {
        let inner = self.inner.lock();
        (inner.activated, inner.reason)
    }

    pub fn set_activation_state(&self, activated: bool, reason: ActivationFailureReason) {
        let changed = {
            let mut inner = self.inner.lock();
            let changed = inner.activated != activated || inner.reason != reason;
            inner.activated = activated;
            inner.reason = reason;
            changed
        };
        info!(activated, ?reason, "activation state set");
        if changed {
            self.announce(EVENT_ACTIVATION_REQUEST);
        }
    }

    pub fn token(&self) -> String {
        self.inner.lock().token.clone()
    }

    pub fn set_token(&self, token: &str) {
        let changed = {
            let mut inner = self.inner.lock();
            let changed = inner.token != token;
            inner.token = token.to_string();
            changed
        };
        if changed {
            self.announce(EVENT_TOKEN_CHANGED);
        }
    }

    fn announce(&self, event_id: &str) {
        match &*self.emitter.lock() {
            Some(emitter) => {
                emitter.emit(Event::new("1.0", event_id).at(self.clock.epoch_ms(), 0))
            }
            None => debug!(event_id, "no emitter wired yet, state change not announced"),
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
