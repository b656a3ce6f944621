// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upload deferral tracking.
//!
//! Certain interactive events (configured under `DAM.UploadEventConfig`)
//! should hold back batch uploads for a quiet period after they are seen.
//! This stage records arrivals and answers "how long should the uploader
//! wait right now"; it never modifies the event stream.

use super::{StageDecision, StageOutput, TransportStage};
use ignite_core::{Clock, ConfigSnapshot, Event};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Stage tracking arrival times of upload-deferring events.
pub struct ActivityDelay {
    clock: Arc<dyn Clock>,
    /// event id → quiet period in seconds.
    timeouts: HashMap<String, u64>,
    /// event id → last arrival, monotonic ms. Latest arrival wins.
    arrivals: Mutex<HashMap<String, u64>>,
}

impl ActivityDelay {
    pub fn new(clock: Arc<dyn Clock>, timeouts: HashMap<String, u64>) -> Self {
        Self { clock, timeouts, arrivals: Mutex::new(HashMap::new()) }
    }

    /// Read `DAM.UploadEventConfig`: `[{eventID, timeoutSec}]`.
    pub fn from_config(clock: Arc<dyn Clock>, config: &ConfigSnapshot) -> Self {
        let mut timeouts = HashMap::new();
        if let serde_json::Value::Array(entries) = config.value("DAM.UploadEventConfig") {
            for entry in entries {
                let event_id = entry.get("eventID").and_then(|v| v.as_str());
                let timeout = entry.get("timeoutSec").and_then(|v| v.as_u64());
                if let (Some(event_id), Some(timeout)) = (event_id, timeout) {
                    timeouts.insert(event_id.to_string(), timeout);
                }
            }
        } else {
            info!("no UploadEventConfig entries");
        }
        Self::new(clock, timeouts)
    }

    /// Seconds the uploader should wait before the next batch: the maximum
    /// remaining quiet period over all recorded events.
    pub fn compute_defer_upload(&self) -> u64 {
        let now_ms = self.clock.monotonic_ms();
        let arrivals = self.arrivals.lock();

        let mut defer = 0;
        for (event_id, arrival_ms) in arrivals.iter() {
            let Some(timeout_s) = self.timeouts.get(event_id) else { continue };
            let elapsed_s = now_ms.saturating_sub(*arrival_ms) / 1_000;
            let remaining = timeout_s.saturating_sub(elapsed_s);
            defer = defer.max(remaining);
        }
        defer
    }
}

impl TransportStage for ActivityDelay {
    fn name(&self) -> &'static str {
        "activity-delay"
    }

    fn handle(&self, event: Event, _out: &mut StageOutput) -> StageDecision {
        if self.timeouts.contains_key(&event.event_id) {
            self.arrivals.lock().insert(event.event_id.clone(), self.clock.monotonic_ms());
        }
        StageDecision::Forward(event)
    }
}

#[cfg(test)]
#[path = "delay_tests.rs"]
mod tests;
