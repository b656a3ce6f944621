// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

fn pool() -> SessionPool {
    SessionPool::new(SessionConfig::default())
}

#[test]
fn acquire_hands_out_distinct_slots_up_to_capacity() {
    let pool = pool();
    let mut leases = Vec::new();
    for _ in 0..MAX_SESSIONS {
        leases.push(pool.acquire().expect("slot available"));
    }
    assert_eq!(pool.acquired_count(), MAX_SESSIONS);
    assert!(pool.acquire().is_none(), "pool exhausted");

    for lease in leases {
        pool.release(lease);
    }
    assert_eq!(pool.acquired_count(), 0);
}

#[test]
fn release_returns_slot_for_reuse() {
    let pool = pool();
    let lease = pool.acquire().unwrap();
    pool.release(lease);
    assert!(pool.acquire().is_some());
}

#[test]
fn threshold_warning_fires_once_per_crossing() {
    let pool = pool();
    let fired = std::sync::Arc::new(AtomicUsize::new(0));
    let fired_in_hook = std::sync::Arc::clone(&fired);
    pool.set_warning_hook(move |_| {
        fired_in_hook.fetch_add(1, Ordering::SeqCst);
    });

    let mut leases = Vec::new();
    for _ in 0..MAX_SESSIONS - 1 {
        leases.push(pool.acquire().unwrap());
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1, "exactly one warning while above threshold");

    // Still above threshold: releasing one and re-acquiring must not re-warn.
    pool.release(leases.pop().unwrap());
    leases.push(pool.acquire().unwrap());
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Drop below the threshold, then cross it again: re-armed.
    for _ in 0..3 {
        pool.release(leases.pop().unwrap());
    }
    for _ in 0..3 {
        leases.push(pool.acquire().unwrap());
    }
    assert_eq!(fired.load(Ordering::SeqCst), 2);

    for lease in leases {
        pool.release(lease);
    }
}

#[test]
fn errored_session_is_not_reused() {
    let pool = pool();
    let lease = pool.acquire().unwrap();
    let stale = std::sync::Arc::as_ptr(&lease.session) as usize;
    lease.session().record_outcome(HttpErrorCode::Server);
    pool.release(lease);

    let fresh = pool.acquire().unwrap();
    assert_ne!(std::sync::Arc::as_ptr(&fresh.session) as usize, stale);
    assert!(fresh.session().last_error().is_ok());
    pool.release(fresh);
}

#[test]
fn proxy_change_reaches_acquired_sessions() {
    let pool = pool();
    let lease = pool.acquire().unwrap();
    let before = std::sync::Arc::as_ptr(&lease.session().client());

    pool.set_proxy("proxy.local", 3128, None, None);

    let after = std::sync::Arc::as_ptr(&lease.session().client());
    assert_ne!(before, after, "held session must be reconfigured in place");
    pool.release(lease);
}

#[test]
fn external_factory_takes_over_construction() {
    struct Counting(AtomicUsize);
    impl SessionFactory for Counting {
        fn build(&self, _config: &SessionConfig) -> Result<HttpSession, HttpErrorCode> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(HttpSession::new(reqwest::Client::new()))
        }
    }

    let pool = pool();
    let factory = std::sync::Arc::new(Counting(AtomicUsize::new(0)));
    pool.set_external_factory(std::sync::Arc::<Counting>::clone(&factory));

    let lease = pool.acquire().unwrap();
    assert_eq!(factory.0.load(Ordering::SeqCst), 1);
    pool.release(lease);
}
