// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::state::ActivationState;
use ignite_core::{FakeClock, MemoryStore};

struct Harness {
    backoff: ActivationBackoff,
    clock: Arc<FakeClock>,
    store: Arc<MemoryStore>,
}

fn harness(enable: bool) -> Harness {
    let clock = Arc::new(FakeClock::new());
    let store = Arc::new(MemoryStore::new());
    let params = BackoffParams { enable, ..BackoffParams::default() };
    let backoff = ActivationBackoff::new(
        params,
        Arc::<FakeClock>::clone(&clock) as Arc<dyn Clock>,
        Arc::<MemoryStore>::clone(&store) as Arc<dyn KvStore>,
        Arc::new(ActivationState::new(store.as_ref(), Arc::<FakeClock>::clone(&clock) as Arc<dyn Clock>)),
        "SER123",
    );
    Harness { backoff, clock, store }
}

/// Advance past the scheduled retry, assert the gate opens, record a failure.
fn fail_once(h: &Harness, code: HttpErrorCode) {
    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed(), "gate should open after next_retry_time");
    h.backoff.calculate_next_retry(code);
}

#[test]
fn disabled_backoff_always_proceeds() {
    let h = harness(false);
    assert!(h.backoff.proceed());
    h.backoff.calculate_next_retry(HttpErrorCode::ResponseData);
    assert!(h.backoff.proceed());
}

#[test]
fn activation_retry_ladder() {
    let h = harness(true);
    assert_eq!(h.backoff.current_phase(), BackoffPhase::Initial);

    for _ in 0..24 {
        fail_once(&h, HttpErrorCode::ResponseData);
    }
    // Transition is evaluated on the next open gate.
    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed());
    assert_eq!(h.backoff.current_phase(), BackoffPhase::HighFreq);

    for _ in 0..10 {
        fail_once(&h, HttpErrorCode::ResponseData);
    }
    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed());
    assert_eq!(h.backoff.current_phase(), BackoffPhase::NormalFreq);

    for _ in 0..15 {
        fail_once(&h, HttpErrorCode::ResponseData);
    }
    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed());
    assert_eq!(h.backoff.current_phase(), BackoffPhase::LowFreq);
}

#[test]
fn ignition_event_resets_to_initial_with_fast_first_retry() {
    let h = harness(true);
    for _ in 0..24 {
        fail_once(&h, HttpErrorCode::ResponseData);
    }
    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed());
    assert_eq!(h.backoff.current_phase(), BackoffPhase::HighFreq);

    let ignition_on = Event::new("1.0", "IgnStatus").with_field("state", "run");
    h.backoff.process_event(&ignition_on);
    assert_eq!(h.backoff.current_phase(), BackoffPhase::Initial);

    // First retry lands one frequency after state entry.
    let entry = h.backoff.next_retry_ms();
    h.clock.set_monotonic_ms(entry + 1);
    assert!(h.backoff.proceed());
    h.backoff.calculate_next_retry(HttpErrorCode::ResponseData);
    assert_eq!(h.backoff.next_retry_ms(), entry + 5_000);
}

#[test]
fn network_errors_do_not_count_or_reschedule() {
    let h = harness(true);
    fail_once(&h, HttpErrorCode::ResponseData);
    let scheduled = h.backoff.next_retry_ms();

    h.backoff.calculate_next_retry(HttpErrorCode::Network);
    assert_eq!(h.backoff.next_retry_ms(), scheduled);
    h.backoff.calculate_next_retry(HttpErrorCode::Timeout);
    assert_eq!(h.backoff.next_retry_ms(), scheduled);
}

#[test]
fn next_retry_is_nondecreasing_within_a_phase() {
    let h = harness(true);
    for _ in 0..24 {
        fail_once(&h, HttpErrorCode::ResponseData);
    }
    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed());
    assert_eq!(h.backoff.current_phase(), BackoffPhase::HighFreq);

    let mut previous = 0;
    for _ in 0..9 {
        fail_once(&h, HttpErrorCode::ResponseData);
        let next = h.backoff.next_retry_ms();
        assert!(next >= previous, "retry time went backwards: {next} < {previous}");
        previous = next;
    }
}

#[test]
fn over_ignition_threshold_takes_the_alternate_ladder() {
    let clock = Arc::new(FakeClock::new());
    let store = Arc::new(MemoryStore::new());
    store.set_i64(ignite_core::store::keys::IGNITION_COUNT, 51).unwrap();

    let backoff = ActivationBackoff::new(
        BackoffParams { enable: true, ..BackoffParams::default() },
        Arc::<FakeClock>::clone(&clock) as Arc<dyn Clock>,
        Arc::<MemoryStore>::clone(&store) as Arc<dyn KvStore>,
        Arc::new(ActivationState::new(store.as_ref(), Arc::<FakeClock>::clone(&clock) as Arc<dyn Clock>)),
        "SER123",
    );
    let h = Harness { backoff, clock, store };

    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed());
    assert_eq!(h.backoff.current_phase(), BackoffPhase::OverIgnThresholdHighFreq);

    for _ in 0..10 {
        fail_once(&h, HttpErrorCode::ResponseData);
    }
    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed());
    assert_eq!(h.backoff.current_phase(), BackoffPhase::OverIgnThresholdLowFreq);

    // Ignition change from the slow over-threshold phase goes to the fast
    // over-threshold phase, not Initial.
    let ignition_on = Event::new("1.0", "IgnStatus").with_field("state", "run");
    h.backoff.process_event(&ignition_on);
    assert_eq!(h.backoff.current_phase(), BackoffPhase::OverIgnThresholdHighFreq);
}

#[test]
fn ignition_count_increments_once_per_edge_and_only_after_counted_outcomes() {
    let h = harness(true);

    let ignition_on = Event::new("1.0", "IgnStatus").with_field("state", "run");
    h.backoff.process_event(&ignition_on);

    // Last outcome is still network-shaped: edge is held, not counted.
    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed());
    assert_eq!(h.store.get_i64(ignite_core::store::keys::IGNITION_COUNT), None);

    h.backoff.calculate_next_retry(HttpErrorCode::ResponseData);
    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed());
    assert_eq!(h.store.get_i64(ignite_core::store::keys::IGNITION_COUNT), Some(1));

    // The edge was consumed; further proceeds do not re-count it.
    h.backoff.calculate_next_retry(HttpErrorCode::ResponseData);
    h.clock.set_monotonic_ms(h.backoff.next_retry_ms() + 1);
    assert!(h.backoff.proceed());
    assert_eq!(h.store.get_i64(ignite_core::store::keys::IGNITION_COUNT), Some(1));
}

#[test]
fn reset_is_idempotent_and_zeroes_the_counter() {
    let h = harness(true);
    for _ in 0..24 {
        fail_once(&h, HttpErrorCode::ResponseData);
    }
    h.backoff.reset();
    h.backoff.reset();
    assert_eq!(h.backoff.current_phase(), BackoffPhase::Initial);
    assert_eq!(h.store.get_i64(ignite_core::store::keys::IGNITION_COUNT), Some(0));
}

#[test]
fn params_load_from_config_with_defaults() {
    let config = ConfigSnapshot::new(serde_json::json!({
        "HCPAuth": { "ActivationBackOffConf": {
            "enable": true,
            "ignitionThreshold": 10,
            "initialFreq": 2000
        }}
    }));
    let params = BackoffParams::from_config(&config);
    assert!(params.enable);
    assert_eq!(params.ignition_threshold, 10);
    assert_eq!(params.initial_freq_ms, 2_000);
    assert_eq!(params.initial_attempts, 24);
    assert_eq!(params.low_freq_duration_ms, 720_000);
}
