// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only journal of routed events awaiting batch upload.
//!
//! One serialized event per line. The uploader (outside this crate) reads
//! and truncates; the router's terminal stage only appends.

use ignite_core::{Event, StoreError};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl EventJournal {
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path, write_lock: Mutex::new(()) })
    }

    pub fn append(&self, event: &Event) -> Result<(), StoreError> {
        let line = event.to_json().map_err(|e| match e {
            ignite_core::EventError::Parse(err) => StoreError::Serialization(err),
            ignite_core::EventError::EmptyEventId => {
                StoreError::Io(std::io::Error::other("event with empty id"))
            }
        })?;

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Total journal size in bytes, 0 when the file does not exist yet.
    pub fn size_bytes(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
