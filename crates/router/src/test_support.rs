// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for router tests.

use crate::pipeline::EventSink;
use crate::registry::{EventProcessor, HandlerError};
use ignite_core::{Event, InvalidEventStore, StoreError};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Handler that records everything it is handed; optionally failing.
pub struct RecordingHandler {
    pub processed: Mutex<Vec<String>>,
    pub configs: Mutex<Vec<Value>>,
    pub resets: AtomicUsize,
    pub fail: bool,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            processed: Mutex::new(Vec::new()),
            configs: Mutex::new(Vec::new()),
            resets: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            processed: Mutex::new(Vec::new()),
            configs: Mutex::new(Vec::new()),
            resets: AtomicUsize::new(0),
            fail: true,
        })
    }
}

impl EventProcessor for RecordingHandler {
    fn process_event(&self, event: &Event) -> Result<(), HandlerError> {
        self.processed.lock().push(event.event_id.clone());
        if self.fail {
            return Err(HandlerError::Failed("boom".to_string()));
        }
        Ok(())
    }

    fn apply_config(&self, notif: &Value) -> Result<(), HandlerError> {
        self.configs.lock().push(notif.clone());
        Ok(())
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Terminal sink that keeps everything it is handed.
#[derive(Default)]
pub struct CollectingSink {
    pub events: Mutex<Vec<Event>>,
}

impl CollectingSink {
    pub fn event_ids(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.event_id.clone()).collect()
    }
}

impl EventSink for CollectingSink {
    fn persist(&self, event: &Event) -> Result<(), StoreError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Unbounded in-memory invalid-event table.
#[derive(Default)]
pub struct MemoryInvalidStore {
    rows: Mutex<(i64, VecDeque<(i64, String)>)>,
}

impl InvalidEventStore for MemoryInvalidStore {
    fn insert_events(&self, serialized: Vec<String>) -> Result<(), StoreError> {
        let mut rows = self.rows.lock();
        for payload in serialized {
            rows.0 += 1;
            let id = rows.0;
            rows.1.push_back((id, payload));
        }
        Ok(())
    }

    fn retrieve_events(&self, limit: usize) -> Vec<(i64, String)> {
        self.rows.lock().1.iter().take(limit).cloned().collect()
    }

    fn delete_events(&self, row_ids: &[i64]) -> Result<(), StoreError> {
        self.rows.lock().1.retain(|(id, _)| !row_ids.contains(id));
        Ok(())
    }

    fn row_count(&self) -> usize {
        self.rows.lock().1.len()
    }
}
