// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ignite_core::{FakeClock, MemoryStore};

struct Capture(Mutex<Vec<String>>);

impl EventEmitter for Capture {
    fn emit(&self, event: Event) {
        self.0.lock().push(event.event_id);
    }
}

fn wired_state() -> (ActivationState, Arc<Capture>) {
    let state = ActivationState::new(&MemoryStore::new(), Arc::new(FakeClock::new()) as Arc<dyn Clock>);
    let capture = Arc::new(Capture(Mutex::new(Vec::new())));
    state.set_emitter(Arc::<Capture>::clone(&capture) as Arc<dyn EventEmitter>);
    (state, capture)
}

#[test]
fn seeds_activated_from_persisted_credentials() {
    let store = MemoryStore::new();
    assert!(!ActivationState::new(&store, Arc::new(FakeClock::new()) as Arc<dyn Clock>).is_activated());

    store.set(keys::LOGIN, "DEV1").unwrap();
    store.set(keys::PASSCODE, "pc").unwrap();
    assert!(ActivationState::new(&store, Arc::new(FakeClock::new()) as Arc<dyn Clock>).is_activated());
}

#[test]
fn state_change_is_announced_once() {
    let (state, capture) = wired_state();

    state.set_activation_state(true, ActivationFailureReason::NoError);
    state.set_activation_state(true, ActivationFailureReason::NoError);
    assert_eq!(capture.0.lock().as_slice(), ["ActivationStateRequest"]);

    state.set_activation_state(false, ActivationFailureReason::StateReset);
    assert_eq!(capture.0.lock().len(), 2);
    assert_eq!(state.activation_state(), (false, ActivationFailureReason::StateReset));
}

#[test]
fn token_change_is_announced() {
    let (state, capture) = wired_state();

    state.set_token("tok-1");
    state.set_token("tok-1");
    state.set_token("tok-2");

    let events = capture.0.lock();
    assert_eq!(events.iter().filter(|id| *id == "TokenChanged").count(), 2);
    drop(events);
    assert_eq!(state.token(), "tok-2");
}

#[test]
fn missing_emitter_is_tolerated() {
    let state = ActivationState::new(&MemoryStore::new(), Arc::new(FakeClock::new()) as Arc<dyn Clock>);
    state.set_activation_state(true, ActivationFailureReason::NoError);
    assert!(state.is_activated());
}
