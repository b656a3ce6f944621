// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport pipeline.
//!
//! An ordered list of stages, each taking ownership of the event and either
//! forwarding it, dropping it, or deferring it. A single driver advances
//! events; stages may also release previously-deferred events (they continue
//! from the next stage, ahead of the current event) or inject synthesized
//! events (they enter the pipeline from the top).

mod delay;
mod session;
mod timestamp;

pub use delay::ActivityDelay;
pub use session::SessionStatusStage;
pub use timestamp::TimestampValidator;

use ignite_core::{Event, StoreError};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Terminal persistence collaborator.
pub trait EventSink: Send + Sync {
    fn persist(&self, event: &Event) -> Result<(), StoreError>;
}

/// What a stage did with the event it was handed.
#[derive(Debug)]
pub enum StageDecision {
    Forward(Event),
    Drop,
    Defer,
}

/// Side output of one stage invocation.
#[derive(Debug, Default)]
pub struct StageOutput {
    /// Previously-deferred events released now; they continue through the
    /// stages after the current one, in order, ahead of the current event.
    pub released: Vec<Event>,
    /// Synthesized events entering the pipeline from the first stage.
    pub injected: Vec<Event>,
}

/// One transport stage.
pub trait TransportStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, event: Event, out: &mut StageOutput) -> StageDecision;
}

/// The fixed stage chain plus the terminal sink.
pub struct TransportPipeline {
    stages: Vec<Arc<dyn TransportStage>>,
    sink: Arc<dyn EventSink>,
}

impl TransportPipeline {
    pub fn new(stages: Vec<Arc<dyn TransportStage>>, sink: Arc<dyn EventSink>) -> Self {
        Self { stages, sink }
    }

    /// Run one event (and everything it releases or injects) through the
    /// chain. Returns the events that reached the terminal stage, in order.
    pub fn run(&self, event: Event) -> Vec<Event> {
        let mut pending = VecDeque::from([event]);
        let mut delivered = Vec::new();

        while let Some(next) = pending.pop_front() {
            self.advance(next, 0, &mut pending, &mut delivered);
        }
        delivered
    }

    fn advance(
        &self,
        event: Event,
        stage_index: usize,
        pending: &mut VecDeque<Event>,
        delivered: &mut Vec<Event>,
    ) {
        if stage_index == self.stages.len() {
            if let Err(error) = self.sink.persist(&event) {
                warn!(%error, event_id = %event.event_id, "could not persist event");
            }
            delivered.push(event);
            return;
        }

        let stage = &self.stages[stage_index];
        let mut out = StageOutput::default();
        let decision = stage.handle(event, &mut out);

        pending.extend(out.injected);
        for released in out.released {
            self.advance(released, stage_index + 1, pending, delivered);
        }

        match decision {
            StageDecision::Forward(event) => {
                self.advance(event, stage_index + 1, pending, delivered)
            }
            StageDecision::Drop => debug!(stage = stage.name(), "event dropped"),
            StageDecision::Defer => debug!(stage = stage.name(), "event deferred"),
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
