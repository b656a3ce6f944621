// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: file paths plus the JSON configuration document.

use ignite_core::{ConfigSnapshot, SharedConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Resolved paths and the parsed configuration document.
pub struct Config {
    /// Root state directory.
    pub state_dir: PathBuf,
    /// Persisted key-value state file.
    pub state_path: PathBuf,
    /// Routed-event journal awaiting upload.
    pub journal_path: PathBuf,
    /// Daemon log file.
    pub log_path: PathBuf,
    /// Host → agent command socket.
    pub command_socket: PathBuf,
    /// Agent → host point-to-point socket.
    pub push_socket: PathBuf,
    /// Agent → host broadcast socket.
    pub pub_socket: PathBuf,
    /// The configuration document, swappable at runtime.
    pub shared: Arc<SharedConfig>,
}

impl Config {
    /// Load the configuration file and resolve paths.
    ///
    /// Socket paths default to the host platform's fixed endpoints and may
    /// be overridden under the `IPC` section.
    pub fn load(config_path: &Path, state_dir: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(config_path)?;
        let snapshot = ConfigSnapshot::from_str(&raw)?;

        let socket = |key: &str, default: &str| -> PathBuf {
            let configured = snapshot.get_string(key);
            if configured.is_empty() {
                PathBuf::from(default)
            } else {
                PathBuf::from(configured)
            }
        };

        Ok(Self {
            state_dir: state_dir.to_path_buf(),
            state_path: state_dir.join("state.json"),
            journal_path: state_dir.join("events.jsonl"),
            log_path: state_dir.join("ignited.log"),
            command_socket: socket("IPC.commandSocket", "/tmp/ipcd_notif.ipc"),
            push_socket: socket("IPC.pushSocket", "/tmp/ipcd_remote.ipc"),
            pub_socket: socket("IPC.pubSocket", "/tmp/pub_ic.ipc"),
            shared: Arc::new(SharedConfig::new(snapshot)),
        })
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.shared.load()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
