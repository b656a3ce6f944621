// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ignite_core::FakeClock;

fn stage(gen_on: bool, gen_off: bool) -> SessionStatusStage {
    SessionStatusStage::new(Arc::new(FakeClock::new()) as Arc<dyn Clock>, gen_on, gen_off)
}

fn rpm(value: f64) -> Event {
    Event::new("1.0", "RPM").at(1.0, 0).with_field("value", value)
}

fn ign(state: &str) -> Event {
    Event::new("1.0", "IgnStatus").at(1.0, 0).with_field("state", state)
}

fn handle(stage: &SessionStatusStage, event: Event) -> (StageDecision, StageOutput) {
    let mut out = StageOutput::default();
    let decision = stage.handle(event, &mut out);
    (decision, out)
}

fn injected_ids(out: &StageOutput) -> Vec<&str> {
    out.injected.iter().map(|e| e.event_id.as_str()).collect()
}

#[test]
fn positive_rpm_synthesizes_ignition_on_when_enabled() {
    let stage = stage(true, true);
    let (_, out) = handle(&stage, rpm(800.0));
    assert_eq!(injected_ids(&out), vec!["IgnStatus"]);
    assert_eq!(out.injected[0].get_string("state"), "run");

    // Already on: no repeat.
    let (_, out) = handle(&stage, rpm(900.0));
    assert!(out.injected.is_empty());
}

#[test]
fn zero_rpm_synthesizes_ignition_off_when_enabled() {
    let stage = stage(true, true);
    handle(&stage, rpm(800.0));
    let (_, out) = handle(&stage, rpm(0.0));
    assert_eq!(out.injected[0].get_string("state"), "off");
}

#[test]
fn rpm_synthesis_respects_config_flags() {
    let stage = stage(false, false);
    let (_, out) = handle(&stage, rpm(800.0));
    assert!(out.injected.is_empty(), "generation disabled");

    let (_, out) = handle(&stage, rpm(0.0));
    assert!(out.injected.is_empty());
}

#[test]
fn ignition_run_starts_a_session_once() {
    let stage = stage(true, true);
    let (decision, out) = handle(&stage, ign("run"));
    assert!(matches!(decision, StageDecision::Forward(_)));
    assert_eq!(injected_ids(&out), vec!["SessionStatus"]);
    assert_eq!(out.injected[0].get_string("status"), "startup");
    assert!(stage.session_in_progress());

    // Repeated run state changes nothing.
    let (_, out) = handle(&stage, ign("run"));
    assert!(out.injected.is_empty());
}

#[test]
fn ignition_off_ends_the_session() {
    let stage = stage(true, true);
    handle(&stage, ign("run"));
    let (_, out) = handle(&stage, ign("off"));
    assert_eq!(out.injected[0].get_string("status"), "shutdown");
    assert!(!stage.session_in_progress());
}

#[test]
fn events_outside_a_session_are_dropped_unless_excepted() {
    let stage = stage(true, true);

    let (decision, _) = handle(&stage, Event::new("1.0", "Speed").at(1.0, 0));
    assert!(matches!(decision, StageDecision::Drop));

    let (decision, _) = handle(&stage, Event::new("1.0", "Activation").at(1.0, 0));
    assert!(matches!(decision, StageDecision::Forward(_)));

    let (decision, _) = handle(&stage, Event::new("1.0", "FirmwareDownloaded").at(1.0, 0));
    assert!(matches!(decision, StageDecision::Forward(_)));
}

#[test]
fn events_flow_freely_inside_a_session() {
    let stage = stage(true, true);
    handle(&stage, ign("run"));

    let (decision, _) = handle(&stage, Event::new("1.0", "Speed").at(1.0, 0));
    assert!(matches!(decision, StageDecision::Forward(_)));
}
