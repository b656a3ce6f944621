// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration snapshots.
//!
//! The agent configuration is a JSON document loaded once at startup and
//! republished whole on change. Readers hold a `SharedConfig` and take an
//! immutable snapshot per operation; there is no partial in-place mutation.

use arc_swap::ArcSwap;
use serde_json::Value;
use std::sync::Arc;

/// An immutable view over the configuration document.
///
/// Keys are addressed with dot paths (`"HCPAuth.ActivationBackOffConf.enable"`).
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    root: Value,
}

impl ConfigSnapshot {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn from_str(raw: &str) -> Result<Self, serde_json::Error> {
        Ok(Self { root: serde_json::from_str(raw)? })
    }

    /// Raw JSON value at a dot path, `Null` when absent.
    pub fn value(&self, path: &str) -> &Value {
        let mut current = &self.root;
        for segment in path.split('.') {
            match current.get(segment) {
                Some(next) => current = next,
                None => return &Value::Null,
            }
        }
        current
    }

    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        self.value(path).as_bool().unwrap_or(default)
    }

    pub fn get_i64(&self, path: &str, default: i64) -> i64 {
        self.value(path).as_i64().unwrap_or(default)
    }

    pub fn get_u64(&self, path: &str, default: u64) -> u64 {
        self.value(path).as_u64().unwrap_or(default)
    }

    pub fn get_string(&self, path: &str) -> String {
        self.value(path).as_str().unwrap_or_default().to_string()
    }

    /// String entries of an array value; non-strings are skipped.
    pub fn get_string_list(&self, path: &str) -> Vec<String> {
        match self.value(path) {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Lock-free shared handle over the current configuration snapshot.
#[derive(Default)]
pub struct SharedConfig {
    inner: ArcSwap<ConfigSnapshot>,
}

impl SharedConfig {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self { inner: ArcSwap::from_pointee(snapshot) }
    }

    /// Current snapshot; cheap, no lock.
    pub fn load(&self) -> Arc<ConfigSnapshot> {
        self.inner.load_full()
    }

    /// Replace the whole document atomically.
    pub fn swap(&self, snapshot: ConfigSnapshot) {
        self.inner.store(Arc::new(snapshot));
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
