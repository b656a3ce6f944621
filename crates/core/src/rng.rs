// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seeded random draws for retry scheduling.
//!
//! Backoff windows are randomized per device so a fleet sharing a power
//! cycle does not retry in lockstep; the seed mixes the device serial with
//! the caller-supplied entropy (usually wall-clock seconds).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Uniform draw in `[min, max]`, seeded from `seed_key` and `entropy`.
pub fn draw(seed_key: &str, entropy: u64, min: u64, max: u64) -> u64 {
    if min >= max {
        return min;
    }
    let mut rng = StdRng::seed_from_u64(seed(seed_key) ^ entropy);
    rng.gen_range(min..=max)
}

/// Uniform draw in `[0, max]`.
pub fn draw_up_to(seed_key: &str, entropy: u64, max: u64) -> u64 {
    draw(seed_key, entropy, 0, max)
}

fn seed(seed_key: &str) -> u64 {
    let digest = Sha256::digest(seed_key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

#[cfg(test)]
#[path = "rng_tests.rs"]
mod tests;
