// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ignite_core::FakeClock;
use std::time::Duration;

fn stage() -> (ActivityDelay, Arc<FakeClock>) {
    let clock = Arc::new(FakeClock::new());
    let mut timeouts = HashMap::new();
    timeouts.insert("MediaPlay".to_string(), 30u64);
    timeouts.insert("NavStart".to_string(), 60u64);
    let stage =
        ActivityDelay::new(Arc::<FakeClock>::clone(&clock) as Arc<dyn Clock>, timeouts);
    (stage, clock)
}

fn feed(stage: &ActivityDelay, event_id: &str) {
    let mut out = StageOutput::default();
    let decision = stage.handle(Event::new("1.0", event_id).at(1.0, 0), &mut out);
    assert!(matches!(decision, StageDecision::Forward(_)), "delay stage never drops");
}

#[test]
fn no_recorded_events_means_no_deferral() {
    let (stage, _) = stage();
    assert_eq!(stage.compute_defer_upload(), 0);
}

#[test]
fn unmatched_events_are_not_recorded() {
    let (stage, _) = stage();
    feed(&stage, "Speed");
    assert_eq!(stage.compute_defer_upload(), 0);
}

#[test]
fn defer_time_is_the_remaining_timeout() {
    let (stage, clock) = stage();
    feed(&stage, "MediaPlay");
    clock.advance(Duration::from_secs(10));
    assert_eq!(stage.compute_defer_upload(), 20);
}

#[test]
fn maximum_over_all_recorded_events_wins() {
    let (stage, clock) = stage();
    feed(&stage, "MediaPlay");
    feed(&stage, "NavStart");
    clock.advance(Duration::from_secs(10));
    assert_eq!(stage.compute_defer_upload(), 50, "NavStart has more left");
}

#[test]
fn latest_arrival_wins_for_a_repeated_event() {
    let (stage, clock) = stage();
    feed(&stage, "MediaPlay");
    clock.advance(Duration::from_secs(25));
    feed(&stage, "MediaPlay");
    clock.advance(Duration::from_secs(10));
    assert_eq!(stage.compute_defer_upload(), 20, "window restarts on re-arrival");
}

#[test]
fn elapsed_timeouts_saturate_to_zero() {
    let (stage, clock) = stage();
    feed(&stage, "MediaPlay");
    clock.advance(Duration::from_secs(120));
    assert_eq!(stage.compute_defer_upload(), 0);
}

#[test]
fn config_parsing_reads_upload_event_entries() {
    let config = ignite_core::ConfigSnapshot::new(serde_json::json!({
        "DAM": { "UploadEventConfig": [
            { "eventID": "MediaPlay", "timeoutSec": 30 },
            { "eventID": "broken" },
            { "timeoutSec": 5 }
        ]}
    }));
    let clock = Arc::new(FakeClock::new());
    let stage = ActivityDelay::from_config(clock as Arc<dyn Clock>, &config);
    feed(&stage, "MediaPlay");
    assert_eq!(stage.compute_defer_upload(), 30);
}
