// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn draw_stays_within_bounds() {
    for entropy in 0..200 {
        let value = draw("SER123", entropy, 10, 20);
        assert!((10..=20).contains(&value), "out of range: {value}");
    }
}

#[test]
fn draw_is_deterministic_for_same_inputs() {
    assert_eq!(draw("SER123", 7, 0, 1_000_000), draw("SER123", 7, 0, 1_000_000));
}

#[test]
fn different_serials_diverge() {
    let a: Vec<u64> = (0..16).map(|e| draw("SER-A", e, 0, 1_000_000)).collect();
    let b: Vec<u64> = (0..16).map(|e| draw("SER-B", e, 0, 1_000_000)).collect();
    assert_ne!(a, b);
}

#[test]
fn degenerate_window_returns_min() {
    assert_eq!(draw("SER123", 1, 5, 5), 5);
    assert_eq!(draw_up_to("SER123", 1, 0), 0);
}
