// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(60, 30, 240, "SER123")
}

#[test]
fn success_resets_counter_and_returns_success_time() {
    let mut b = backoff();
    b.next_retry_time(HttpErrorCode::Server, 1);
    b.next_retry_time(HttpErrorCode::Server, 2);
    assert_eq!(b.retry_count(), 2);

    assert_eq!(b.next_retry_time(HttpErrorCode::Ok, 3), 60);
    assert_eq!(b.retry_count(), 0);
}

#[test]
fn server_errors_grow_the_window_up_to_the_cap() {
    let mut b = backoff();
    // Windows: [0,30], [0,60], [0,120], [0,240], [0,240]...
    let mut previous_cap = 0;
    for round in 0..5 {
        let wait = b.next_retry_time(HttpErrorCode::Server, round);
        let cap = (30u64 << round).min(240);
        assert!(wait <= cap, "round {round}: {wait} > {cap}");
        previous_cap = cap;
    }
    assert_eq!(previous_cap, 240);
    assert_eq!(b.retry_count(), 5);
}

#[test]
fn timeouts_are_treated_like_server_failures() {
    let mut b = backoff();
    b.next_retry_time(HttpErrorCode::Timeout, 1);
    assert_eq!(b.retry_count(), 1);
}

#[test]
fn other_failures_use_the_flat_failure_time() {
    let mut b = backoff();
    assert_eq!(b.next_retry_time(HttpErrorCode::Access, 1), 30);
    assert_eq!(b.next_retry_time(HttpErrorCode::ResponseData, 2), 30);
    assert_eq!(b.retry_count(), 0, "flat failures do not escalate the window");
}
