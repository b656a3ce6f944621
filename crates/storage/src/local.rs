// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed key-value store for persisted device state.
//!
//! The whole map is one JSON object on disk, rewritten atomically
//! (temp file + rename) on every mutation. The key set is small and writes
//! are rare (ignition edges, credential changes), so full rewrites are fine.

use ignite_core::{KvStore, StoreError};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Persisted key-value state under a single JSON file.
pub struct LocalConfig {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl LocalConfig {
    /// Open the store, loading any existing content.
    ///
    /// A corrupt file is logged and treated as empty; the next write
    /// replaces it.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let values = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(map) => map
                    .into_iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                    .collect(),
                Err(error) => {
                    warn!(path = %path.display(), %error, "discarding corrupt state file");
                    HashMap::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(error) => return Err(error.into()),
        };

        Ok(Self { path, values: Mutex::new(values) })
    }

    fn flush(&self, values: &HashMap<String, String>) -> Result<(), StoreError> {
        let map: Map<String, Value> = values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let raw = serde_json::to_string_pretty(&Value::Object(map))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KvStore for LocalConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock();
        values.remove(key);
        self.flush(&values)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
