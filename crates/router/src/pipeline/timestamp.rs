// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp validation and backfill.
//!
//! Devices without a battery-backed clock produce early events with
//! pre-wall-clock timestamps. Until the first valid timestamp is seen,
//! sub-cutoff events are parked (in memory, overflowing to the invalid-event
//! table); once a valid timestamp arrives, parked events are released with
//! reconstructed timestamps anchored to it.

use super::{StageDecision, StageOutput, TransportStage};
use ignite_core::{Event, InvalidEventStore};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 2024-01-01 UTC in epoch milliseconds. Anything earlier predates the
/// product's first wall-clock sync.
const TIMESTAMP_CUTOFF_MS: f64 = 1_704_067_200_000.0;

/// Cap on the in-memory initial queue.
const INITIAL_QUEUE_LIMIT: usize = 100;

/// Batch size when draining the overflow table.
const DRAIN_BATCH_ROWS: usize = 100;

struct ValidatorState {
    last_invalid_ts: f64,
    first_valid_ts: f64,
    initial_queue: VecDeque<Event>,
    overflowed_to_store: bool,
}

/// Pipeline stage enforcing the timestamp floor.
pub struct TimestampValidator {
    exceptions: HashSet<String>,
    store_invalid_events: bool,
    invalid_store: Arc<dyn InvalidEventStore>,
    state: Mutex<ValidatorState>,
}

impl TimestampValidator {
    pub fn new(
        exceptions: impl IntoIterator<Item = String>,
        store_invalid_events: bool,
        invalid_store: Arc<dyn InvalidEventStore>,
    ) -> Self {
        let exceptions: HashSet<String> = exceptions.into_iter().collect();
        for event_id in &exceptions {
            info!(event_id, "timestamp validation exception");
        }
        Self {
            exceptions,
            store_invalid_events,
            invalid_store,
            state: Mutex::new(ValidatorState {
                last_invalid_ts: 0.0,
                first_valid_ts: 0.0,
                initial_queue: VecDeque::new(),
                overflowed_to_store: false,
            }),
        }
    }

    /// Fix a sub-cutoff event against the first valid timestamp, or `None`
    /// when reconstruction is impossible.
    fn fix(state: &ValidatorState, mut event: Event, original_ts: f64) -> Option<Event> {
        if original_ts >= TIMESTAMP_CUTOFF_MS {
            return Some(event);
        }

        // Without a recorded last-invalid anchor there is nothing to
        // reconstruct from; the event is unusable.
        if state.last_invalid_ts == 0.0 {
            error!(
                event_id = %event.event_id,
                original_ts,
                "cannot fix event with pre-cutoff timestamp"
            );
            return None;
        }

        let delta = state.last_invalid_ts - original_ts;
        let fixed = state.first_valid_ts - delta;
        event.add_field("OriginalTimestamp", original_ts);
        event.timestamp = Some(fixed);
        info!(event_id = %event.event_id, fixed, "timestamp backfilled");
        Some(event)
    }

    /// Release everything parked in the overflow table and the queue, fixed,
    /// in arrival order.
    fn drain_deferred(&self, state: &mut ValidatorState, out: &mut StageOutput) {
        if state.overflowed_to_store {
            debug!("draining invalid-event table");
            while self.invalid_store.row_count() > 0 {
                let rows = self.invalid_store.retrieve_events(DRAIN_BATCH_ROWS);
                if rows.is_empty() {
                    break;
                }
                let row_ids: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();
                for (_, raw) in rows {
                    match Event::from_json(&raw) {
                        Ok(event) => {
                            let original = event.timestamp.unwrap_or(0.0);
                            if let Some(fixed) = Self::fix(state, event, original) {
                                out.released.push(fixed);
                            }
                        }
                        Err(error) => warn!(%error, "unreadable parked event"),
                    }
                }
                if self.invalid_store.delete_events(&row_ids).is_err() {
                    break;
                }
            }
            state.overflowed_to_store = false;
        }

        while let Some(event) = state.initial_queue.pop_front() {
            let original = event.timestamp.unwrap_or(0.0);
            if let Some(fixed) = Self::fix(state, event, original) {
                out.released.push(fixed);
            }
        }
    }

    /// Park a sub-cutoff event observed before any valid timestamp.
    fn park(&self, state: &mut ValidatorState, event: Event, out: &mut StageOutput) {
        warn!(event_id = %event.event_id, "parking event with pre-cutoff timestamp");
        state.initial_queue.push_back(event);

        if state.initial_queue.len() <= INITIAL_QUEUE_LIMIT {
            return;
        }

        if self.store_invalid_events {
            // Oldest INITIAL_QUEUE_LIMIT rows go to the store; the newest
            // arrival stays queued.
            info!("initial queue over limit, overflowing to store");
            let keep = state.initial_queue.len() - 1;
            let serialized: Vec<String> = state
                .initial_queue
                .drain(..keep)
                .filter_map(|e| e.to_json().ok())
                .collect();
            state.overflowed_to_store = true;
            if let Err(error) = self.invalid_store.insert_events(serialized) {
                error!(%error, "overflow insert failed, events lost");
            }
        } else {
            // Flush the queue through unchanged, pre-cutoff timestamps and all.
            info!("initial queue over limit, flushing through");
            out.released.extend(state.initial_queue.drain(..).filter(|e| !e.event_id.is_empty()));
        }
    }
}

impl TransportStage for TimestampValidator {
    fn name(&self) -> &'static str {
        "timestamp-validator"
    }

    fn handle(&self, event: Event, out: &mut StageOutput) -> StageDecision {
        let Some(ts) = event.timestamp else {
            error!(event_id = %event.event_id, "event without timestamp");
            return StageDecision::Drop;
        };
        if event.event_id.is_empty() {
            error!("ignoring event with empty id");
            return StageDecision::Drop;
        }

        let mut state = self.state.lock();

        if state.first_valid_ts == 0.0 {
            // Exception events bypass validation until the clock settles.
            if self.exceptions.contains(&event.event_id) {
                info!(event_id = %event.event_id, "exception event, skipping validation");
                return StageDecision::Forward(event);
            }

            if ts < TIMESTAMP_CUTOFF_MS {
                if ts > state.last_invalid_ts {
                    state.last_invalid_ts = ts;
                }
                self.park(&mut state, event, out);
                return StageDecision::Defer;
            }

            state.first_valid_ts = ts;
            info!(first_valid_ts = ts, "got first valid timestamp");
            self.drain_deferred(&mut state, out);
            return StageDecision::Forward(event);
        }

        match Self::fix(&state, event, ts) {
            Some(fixed) => StageDecision::Forward(fixed),
            None => StageDecision::Drop,
        }
    }
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
