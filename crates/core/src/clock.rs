// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Subsystems that schedule retries use `monotonic_ms` (immune to wall-clock
//! steps); event stamping uses `epoch_ms`, a double because that is what the
//! wire carries.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Milliseconds since a process-local origin; never goes backwards.
    fn monotonic_ms(&self) -> u64;

    /// Wall-clock epoch milliseconds.
    fn epoch_ms(&self) -> f64;
}

/// Real system clock.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn epoch_ms(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as f64
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone, Default)]
pub struct FakeClock {
    monotonic_ms: Arc<Mutex<u64>>,
    epoch_ms: Arc<Mutex<f64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance both the monotonic and wall clock.
    pub fn advance(&self, duration: Duration) {
        *self.monotonic_ms.lock() += duration.as_millis() as u64;
        *self.epoch_ms.lock() += duration.as_millis() as f64;
    }

    pub fn set_monotonic_ms(&self, ms: u64) {
        *self.monotonic_ms.lock() = ms;
    }

    pub fn set_epoch_ms(&self, ms: f64) {
        *self.epoch_ms.lock() = ms;
    }
}

impl Clock for FakeClock {
    fn monotonic_ms(&self) -> u64 {
        *self.monotonic_ms.lock()
    }

    fn epoch_ms(&self) -> f64 {
        *self.epoch_ms.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
