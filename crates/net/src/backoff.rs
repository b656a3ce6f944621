// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential retry timing for upload-style requests.

use crate::error::HttpErrorCode;
use ignite_core::rng;

/// Per-request retry timer.
///
/// Times are in seconds. Server-shaped failures double the wait per
/// consecutive failure up to `max_retry_time`, randomized so devices do not
/// retry in lockstep; other failures retry at the flat `failure_time`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    success_time: u64,
    failure_time: u64,
    max_retry_time: u64,
    retry_count: u32,
    seed_key: String,
}

impl ExponentialBackoff {
    pub fn new(success_time: u64, failure_time: u64, max_retry_time: u64, seed_key: &str) -> Self {
        Self {
            success_time,
            failure_time,
            max_retry_time,
            retry_count: 0,
            seed_key: seed_key.to_string(),
        }
    }

    /// Seconds to wait before the next attempt, given the last outcome.
    pub fn next_retry_time(&mut self, code: HttpErrorCode, entropy: u64) -> u64 {
        if code.is_ok() {
            self.retry_count = 0;
            return self.success_time;
        }

        if matches!(code, HttpErrorCode::Server | HttpErrorCode::Timeout) {
            return self.backoff_retry_time(entropy);
        }

        // Not a server connection failure, just the usual retry cadence.
        self.failure_time
    }

    /// `failure_time * 2^retry_count` capped, then randomized in `[0, t]`.
    fn backoff_retry_time(&mut self, entropy: u64) -> u64 {
        let doubled = self.failure_time.saturating_mul(1u64 << self.retry_count.min(32));
        let capped = doubled.min(self.max_retry_time);
        self.retry_count += 1;
        rng::draw_up_to(&self.seed_key, entropy, capped)
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
