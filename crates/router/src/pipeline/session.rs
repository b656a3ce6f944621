// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session status synthesis.
//!
//! Tracks ignition through `IgnStatus` events (synthesizing them from `RPM`
//! readings when configured) and brackets the event stream with
//! `SessionStatus` startup/shutdown events. Outside a session, only a fixed
//! set of exception events is allowed through.

use super::{StageDecision, StageOutput, TransportStage};
use ignite_core::{Clock, Event};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

const EVENT_RPM: &str = "RPM";
const EVENT_IGN_STATUS: &str = "IgnStatus";
const EVENT_SESSION_STATUS: &str = "SessionStatus";
const IGN_STATE_RUN: &str = "run";
const IGN_STATE_OFF: &str = "off";

/// Events that may leave the device even when no session is in progress.
const SESSION_EXCEPTIONS: &[&str] = &[
    "Activation",
    "ActivationEvent",
    "ActivationStateRequest",
    "DeviceRemoval",
    "FirmwareDownloaded",
    "IgniteClientLaunched",
    "TokenChanged",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IgnitionState {
    Off,
    On,
    Unknown,
}

struct SessionState {
    ign_state: IgnitionState,
    last_ign_state: IgnitionState,
    session_in_progress: bool,
}

/// Pipeline stage synthesizing ignition and session events.
pub struct SessionStatusStage {
    clock: Arc<dyn Clock>,
    gen_ign_on: bool,
    gen_ign_off: bool,
    exceptions: HashSet<String>,
    state: Mutex<SessionState>,
}

impl SessionStatusStage {
    pub fn new(clock: Arc<dyn Clock>, gen_ign_on: bool, gen_ign_off: bool) -> Self {
        Self {
            clock,
            gen_ign_on,
            gen_ign_off,
            exceptions: SESSION_EXCEPTIONS.iter().map(|s| s.to_string()).collect(),
            state: Mutex::new(SessionState {
                ign_state: IgnitionState::Unknown,
                last_ign_state: IgnitionState::Unknown,
                session_in_progress: false,
            }),
        }
    }

    pub fn session_in_progress(&self) -> bool {
        self.state.lock().session_in_progress
    }

    fn synthesize(&self, event_id: &str) -> Event {
        Event::new("1.0", event_id).at(self.clock.epoch_ms(), 0)
    }

    fn handle_rpm(&self, event: &Event, out: &mut StageOutput) {
        let rpm = event.get_f64("value").unwrap_or(0.0);
        let mut state = self.state.lock();

        if rpm > 0.0 && state.ign_state != IgnitionState::On {
            if self.gen_ign_on {
                info!(rpm, "synthesizing ignition-on from RPM");
                out.injected
                    .push(self.synthesize(EVENT_IGN_STATUS).with_field("state", IGN_STATE_RUN));
            }
            state.ign_state = IgnitionState::On;
        } else if rpm <= 0.0 && state.ign_state == IgnitionState::On {
            if self.gen_ign_off {
                info!(rpm, "synthesizing ignition-off from RPM");
                out.injected
                    .push(self.synthesize(EVENT_IGN_STATUS).with_field("state", IGN_STATE_OFF));
            }
            state.ign_state = IgnitionState::Off;
        }
    }

    fn handle_ign_status(&self, event: &Event, out: &mut StageOutput) {
        let ign_state = match event.get_string("state").as_str() {
            IGN_STATE_RUN => IgnitionState::On,
            IGN_STATE_OFF => IgnitionState::Off,
            _ => IgnitionState::Unknown,
        };

        let mut state = self.state.lock();
        if ign_state == state.last_ign_state {
            debug!(?ign_state, "repeated ignition state");
            return;
        }
        state.last_ign_state = ign_state;
        state.ign_state = ign_state;

        match ign_state {
            IgnitionState::On if !state.session_in_progress => {
                state.session_in_progress = true;
                info!("session startup");
                out.injected
                    .push(self.synthesize(EVENT_SESSION_STATUS).with_field("status", "startup"));
            }
            IgnitionState::Off if state.session_in_progress => {
                state.session_in_progress = false;
                info!("session shutdown");
                out.injected
                    .push(self.synthesize(EVENT_SESSION_STATUS).with_field("status", "shutdown"));
            }
            _ => {}
        }
    }

    fn may_pass(&self, event: &Event) -> bool {
        if self.state.lock().session_in_progress {
            return true;
        }
        matches!(event.event_id.as_str(), EVENT_IGN_STATUS | EVENT_SESSION_STATUS)
            || self.exceptions.contains(&event.event_id)
    }
}

impl TransportStage for SessionStatusStage {
    fn name(&self) -> &'static str {
        "session-status"
    }

    fn handle(&self, event: Event, out: &mut StageOutput) -> StageDecision {
        match event.event_id.as_str() {
            EVENT_RPM => self.handle_rpm(&event, out),
            EVENT_IGN_STATUS => self.handle_ign_status(&event, out),
            _ => {}
        }

        if self.may_pass(&event) {
            StageDecision::Forward(event)
        } else {
            debug!(event_id = %event.event_id, "no session in progress, dropping");
            StageDecision::Drop
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
