// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted key-value state.
//!
//! The agent keeps a small set of string keys across restarts (device id,
//! VIN, ignition counter, upload bookkeeping). The storage driver itself is
//! a collaborator; this trait is the surface the core consumes.

use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// Well-known persisted keys.
pub mod keys {
    pub const LOGIN: &str = "login";
    pub const PASSCODE: &str = "passcode";
    pub const VIN: &str = "VIN";
    pub const LAST_LOCATION: &str = "lastLocation";
    pub const LAST_ODOMETER: &str = "lastOdometer";
    pub const LAST_DEVICE_ID: &str = "lastDeviceId";
    pub const LAST_CONFIG_TS: &str = "lastConfigTS";
    pub const DATA_ENCRY_RND_NO: &str = "dataEncryRndNo";
    pub const IGNITION_COUNT: &str = "IGNITION_COUNT";
    pub const ACTIVATION_STATUS: &str = "ICP.ActivationStatus";
    pub const IC_RUNNING_STATUS: &str = "ICP.ICRunningStatus";
    pub const LAST_SUCCESSFUL_UPLOAD: &str = "UploaderService.LastSuccessfulUpload";
    pub const DEVICE_DISASSOCIATED: &str = "deviceDisassociated";
}

/// Errors from the persisted-state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persisted string key-value state.
pub trait KvStore: Send + Sync {
    /// Value for `key`, `None` when unset.
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Numeric convenience over `get`; unparseable values read as `None`.
    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.set(key, &value.to_string())
    }
}

/// Overflow parking for events the timestamp validator cannot fix yet.
///
/// Rows are `(row_id, serialized_event_json)`; the table is bounded and the
/// implementation purges oldest rows first when the bound is hit.
pub trait InvalidEventStore: Send + Sync {
    fn insert_events(&self, serialized: Vec<String>) -> Result<(), StoreError>;

    /// Up to `limit` rows in insertion order.
    fn retrieve_events(&self, limit: usize) -> Vec<(i64, String)>;

    fn delete_events(&self, row_ids: &[i64]) -> Result<(), StoreError>;

    fn row_count(&self) -> usize;
}

/// In-memory store for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
