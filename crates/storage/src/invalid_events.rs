// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded parking table for events whose timestamps cannot be fixed yet.
//!
//! The timestamp validator overflows its in-memory queue here and drains the
//! table once the first valid wall-clock timestamp arrives. Rows carry the
//! serialized event unchanged; row ids are monotonically increasing.

use ignite_core::{InvalidEventStore, StoreError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::warn;

/// In-memory bounded table of `(row_id, serialized_event)` rows.
///
/// Bounded by total payload bytes; overflow purges oldest rows first.
pub struct BoundedInvalidEventStore {
    max_bytes: usize,
    inner: Mutex<Table>,
}

#[derive(Default)]
struct Table {
    rows: VecDeque<(i64, String)>,
    next_row_id: i64,
    bytes: usize,
}

impl BoundedInvalidEventStore {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes, inner: Mutex::new(Table { next_row_id: 1, ..Table::default() }) }
    }
}

impl InvalidEventStore for BoundedInvalidEventStore {
    fn insert_events(&self, serialized: Vec<String>) -> Result<(), StoreError> {
        let mut table = self.inner.lock();
        for payload in serialized {
            table.bytes += payload.len();
            let row_id = table.next_row_id;
            table.next_row_id += 1;
            table.rows.push_back((row_id, payload));
        }
        // Oldest rows go first when the table outgrows its limit.
        while table.bytes > self.max_bytes && table.rows.len() > 1 {
            if let Some((row_id, dropped)) = table.rows.pop_front() {
                table.bytes -= dropped.len();
                warn!(row_id, "invalid-event table over limit, purging oldest row");
            }
        }
        Ok(())
    }

    fn retrieve_events(&self, limit: usize) -> Vec<(i64, String)> {
        let table = self.inner.lock();
        table.rows.iter().take(limit).cloned().collect()
    }

    fn delete_events(&self, row_ids: &[i64]) -> Result<(), StoreError> {
        let mut table = self.inner.lock();
        table.rows.retain(|(row_id, _)| !row_ids.contains(row_id));
        table.bytes = table.rows.iter().map(|(_, p)| p.len()).sum();
        Ok(())
    }

    fn row_count(&self) -> usize {
        self.inner.lock().rows.len()
    }
}

#[cfg(test)]
#[path = "invalid_events_tests.rs"]
mod tests;
