// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activation retry backoff.
//!
//! A six-phase controller gating outbound activation attempts: quick initial
//! retries, then progressively sparser randomized slots, with an alternate
//! ladder once the persisted ignition counter passes its threshold. Ignition
//! or device-attach changes snap the machine back to a fast phase.

use crate::state::{ActivationFailureReason, ActivationState};
use ignite_core::store::keys;
use ignite_core::{rng, Clock, ConfigSnapshot, Event, KvStore};
use ignite_net::HttpErrorCode;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ONE_SEC_MS: u64 = 1_000;
const MIN_SLOT_SEED_MS: u64 = 5 * ONE_SEC_MS;

/// The six retry phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPhase {
    Initial,
    HighFreq,
    NormalFreq,
    LowFreq,
    OverIgnThresholdHighFreq,
    OverIgnThresholdLowFreq,
}

/// Tunables, overridable through `HCPAuth.ActivationBackOffConf`.
#[derive(Debug, Clone)]
pub struct BackoffParams {
    pub enable: bool,
    pub ignition_threshold: i64,
    pub initial_attempts: u32,
    pub initial_freq_ms: u64,
    pub high_freq_attempts: u32,
    pub high_freq_duration_ms: u64,
    pub normal_freq_attempts: u32,
    pub normal_freq_duration_ms: u64,
    pub low_freq_duration_ms: u64,
    pub over_ign_high_freq_ms: u64,
    pub over_ign_high_freq_attempts: u32,
    pub over_ign_low_freq_ms: u64,
}

impl Default for BackoffParams {
    fn default() -> Self {
        Self {
            enable: false,
            ignition_threshold: 50,
            initial_attempts: 24,
            initial_freq_ms: 5 * ONE_SEC_MS,
            high_freq_attempts: 10,
            high_freq_duration_ms: 60 * ONE_SEC_MS,
            normal_freq_attempts: 15,
            normal_freq_duration_ms: 240 * ONE_SEC_MS,
            low_freq_duration_ms: 720 * ONE_SEC_MS,
            over_ign_high_freq_ms: 12 * ONE_SEC_MS,
            over_ign_high_freq_attempts: 10,
            over_ign_low_freq_ms: 900 * ONE_SEC_MS,
        }
    }
}

impl BackoffParams {
    pub fn from_config(config: &ConfigSnapshot) -> Self {
        let defaults = Self::default();
        let base = "HCPAuth.ActivationBackOffConf";
        let key = |name: &str| format!("{base}.{name}");
        Self {
            enable: config.get_bool(&key("enable"), defaults.enable),
            ignition_threshold: config
                .get_i64(&key("ignitionThreshold"), defaults.ignition_threshold),
            initial_attempts: config.get_u64(&key("initialAttempts"), defaults.initial_attempts as u64)
                as u32,
            initial_freq_ms: config.get_u64(&key("initialFreq"), defaults.initial_freq_ms),
            high_freq_attempts: config
                .get_u64(&key("highFreqAttempts"), defaults.high_freq_attempts as u64)
                as u32,
            high_freq_duration_ms: config
                .get_u64(&key("highFreqDuration"), defaults.high_freq_duration_ms),
            normal_freq_attempts: config
                .get_u64(&key("normalFreqAttempts"), defaults.normal_freq_attempts as u64)
                as u32,
            normal_freq_duration_ms: config
                .get_u64(&key("normalFreqDuration"), defaults.normal_freq_duration_ms),
            low_freq_duration_ms: config
                .get_u64(&key("lowFreqDuration"), defaults.low_freq_duration_ms),
            over_ign_high_freq_ms: config
                .get_u64(&key("highFreqAfterIgnitionThreshold"), defaults.over_ign_high_freq_ms),
            over_ign_high_freq_attempts: config.get_u64(
                &key("highFreqAttemptAfterIgnitionThreshold"),
                defaults.over_ign_high_freq_attempts as u64,
            ) as u32,
            over_ign_low_freq_ms: config
                .get_u64(&key("lowFreqAfterIgnitionThreshold"), defaults.over_ign_low_freq_ms),
        }
    }
}

/// Per-phase retry bookkeeping. Replaced wholesale on every transition.
#[derive(Debug, Clone)]
struct PhaseState {
    phase: BackoffPhase,
    start_time_ms: u64,
    next_retry_ms: u64,
    attempts: u32,
    max_attempts: Option<u32>,
    freq_ms: u64,
    slot_min_ms: u64,
    slot_max_ms: u64,
    ign_changed: bool,
    device_changed: bool,
}

impl PhaseState {
    fn enter(phase: BackoffPhase, params: &BackoffParams, now_ms: u64) -> Self {
        let (max_attempts, freq_ms, slot_seed) = match phase {
            BackoffPhase::Initial => (Some(params.initial_attempts), params.initial_freq_ms, 0),
            BackoffPhase::HighFreq => {
                (Some(params.high_freq_attempts), params.high_freq_duration_ms, MIN_SLOT_SEED_MS)
            }
            BackoffPhase::NormalFreq => {
                (Some(params.normal_freq_attempts), params.normal_freq_duration_ms, 0)
            }
            BackoffPhase::LowFreq => (None, params.low_freq_duration_ms, 0),
            BackoffPhase::OverIgnThresholdHighFreq => {
                (Some(params.over_ign_high_freq_attempts), params.over_ign_high_freq_ms, 0)
            }
            BackoffPhase::OverIgnThresholdLowFreq => (None, params.over_ign_low_freq_ms, 0),
        };

        Self {
            phase,
            start_time_ms: now_ms,
            next_retry_ms: now_ms,
            attempts: 0,
            max_attempts,
            freq_ms,
            slot_min_ms: 0,
            slot_max_ms: slot_seed,
            ign_changed: false,
            device_changed: false,
        }
    }

    fn uses_deterministic_spacing(&self) -> bool {
        matches!(self.phase, BackoffPhase::Initial | BackoffPhase::OverIgnThresholdHighFreq)
    }

    /// Record one failed attempt and schedule the next retry.
    fn activation_failed(&mut self, seed_key: &str, entropy: u64) {
        self.attempts += 1;
        if self.uses_deterministic_spacing() {
            self.next_retry_ms += self.freq_ms;
        } else {
            self.slot_min_ms = self.slot_max_ms;
            self.slot_max_ms += self.freq_ms;
            let offset = rng::draw(seed_key, entropy, self.slot_min_ms, self.slot_max_ms);
            self.next_retry_ms = self.start_time_ms + offset;
        }
        debug!(
            phase = ?self.phase,
            attempts = self.attempts,
            next_retry_ms = self.next_retry_ms,
            "scheduled next activation retry"
        );
    }

    fn attempts_exhausted(&self) -> bool {
        self.max_attempts.is_some_and(|max| self.attempts >= max)
    }
}

/// Pure transition function over the phase state.
fn next_phase(state: &PhaseState, ignition_count: i64, params: &BackoffParams) -> Option<BackoffPhase> {
    if state.ign_changed || state.device_changed {
        return Some(match state.phase {
            BackoffPhase::OverIgnThresholdLowFreq => BackoffPhase::OverIgnThresholdHighFreq,
            _ => BackoffPhase::Initial,
        });
    }

    match state.phase {
        BackoffPhase::Initial if ignition_count > params.ignition_threshold => {
            Some(BackoffPhase::OverIgnThresholdHighFreq)
        }
        BackoffPhase::Initial if state.attempts_exhausted() => Some(BackoffPhase::HighFreq),
        BackoffPhase::HighFreq if state.attempts_exhausted() => Some(BackoffPhase::NormalFreq),
        BackoffPhase::NormalFreq if state.attempts_exhausted() => Some(BackoffPhase::LowFreq),
        BackoffPhase::OverIgnThresholdHighFreq if state.attempts_exhausted() => {
            Some(BackoffPhase::OverIgnThresholdLowFreq)
        }
        _ => None,
    }
}

struct Inner {
    state: PhaseState,
    ignition_count: i64,
    increment_ignition: bool,
    last_error: HttpErrorCode,
}

/// Gate for outbound activation attempts. One instance per process.
pub struct ActivationBackoff {
    params: BackoffParams,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KvStore>,
    activation_state: Arc<ActivationState>,
    seed_key: String,
    inner: Mutex<Inner>,
}

impl ActivationBackoff {
    pub fn new(
        params: BackoffParams,
        clock: Arc<dyn Clock>,
        store: Arc<dyn KvStore>,
        activation_state: Arc<ActivationState>,
        seed_key: &str,
    ) -> Self {
        let ignition_count = store.get_i64(keys::IGNITION_COUNT).unwrap_or(0);
        let state = PhaseState::enter(BackoffPhase::Initial, &params, clock.monotonic_ms());
        if !params.enable {
            warn!("activation backoff disabled");
        }
        Self {
            params,
            clock,
            store,
            activation_state,
            seed_key: seed_key.to_string(),
            inner: Mutex::new(Inner {
                state,
                ignition_count,
                increment_ignition: false,
                last_error: HttpErrorCode::Network,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.params.enable
    }

    pub fn current_phase(&self) -> BackoffPhase {
        self.inner.lock().state.phase
    }

    /// May the next activation attempt start now?
    ///
    /// The decision is snapshotted under the lock and the lock released
    /// before anything external runs.
    pub fn proceed(&self) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let now = self.clock.monotonic_ms();
        let decision = {
            let mut inner = self.inner.lock();
            // A counted (non-network) outcome consumes any pending
            // ignition-on edge.
            if !inner.last_error.is_network_related() {
                self.increment_ignition_count(&mut inner);
            }
            now >= inner.state.next_retry_ms
        };

        if decision {
            info!(now_ms = now, "activation retry window open");
            self.check_current_state();
        }
        decision
    }

    /// Record the outcome of the last attempt.
    ///
    /// Network-shaped errors do not count as failed attempts.
    pub fn calculate_next_retry(&self, code: HttpErrorCode) {
        if !self.is_enabled() {
            return;
        }

        let mut inner = self.inner.lock();
        inner.last_error = code;
        if code.is_network_related() {
            debug!(%code, "network error, not counted against backoff");
            return;
        }

        let entropy = (self.clock.epoch_ms() / 1_000.0) as u64;
        let seed_key = self.seed_key.clone();
        inner.state.activation_failed(&seed_key, entropy);
        warn!(attempts = inner.state.attempts, phase = ?inner.state.phase,
              "unsuccessful activation attempt");
    }

    /// Consume ignition and device events; transitions may follow.
    pub fn process_event(&self, event: &Event) {
        if !self.is_enabled() || self.activation_state.is_activated() {
            return;
        }

        match event.event_id.as_str() {
            "IgnStatus" => {
                let mut inner = self.inner.lock();
                let on = event.get_string("state") == "run";
                if on {
                    inner.increment_ignition = true;
                }
                inner.state.ign_changed = on;
            }
            "DeviceRemoval" => {
                let mut inner = self.inner.lock();
                inner.state.device_changed = event.get_string("status") == "attached";
            }
            _ => return,
        }

        self.check_current_state();
    }

    /// Zero the persisted ignition counter and drop back to the initial phase.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.ignition_count = 0;
        inner.increment_ignition = false;
        if let Err(error) = self.store.set_i64(keys::IGNITION_COUNT, 0) {
            warn!(%error, "could not persist ignition counter");
        }
        inner.state = PhaseState::enter(BackoffPhase::Initial, &self.params, self.clock.monotonic_ms());
    }

    /// Next scheduled retry, monotonic milliseconds.
    pub fn next_retry_ms(&self) -> u64 {
        self.inner.lock().state.next_retry_ms
    }

    fn increment_ignition_count(&self, inner: &mut Inner) {
        if !inner.increment_ignition {
            return;
        }
        inner.ignition_count += 1;
        inner.increment_ignition = false;
        if let Err(error) = self.store.set_i64(keys::IGNITION_COUNT, inner.ignition_count) {
            warn!(%error, "could not persist ignition counter");
        }
        info!(count = inner.ignition_count, "ignition count");
    }

    fn check_current_state(&self) {
        let transitioned = {
            let mut inner = self.inner.lock();
            match next_phase(&inner.state, inner.ignition_count, &self.params) {
                Some(phase) => {
                    inner.state = PhaseState::enter(phase, &self.params, self.clock.monotonic_ms());
                    info!(?phase, "backoff state changed");
                    Some(phase)
                }
                None => None,
            }
        };

        // Entering any throttled phase resets the published activation state.
        if let Some(phase) = transitioned {
            if phase != BackoffPhase::Initial {
                self.activation_state
                    .set_activation_state(false, ActivationFailureReason::StateReset);
            }
        }
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
