// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event routing: the handler registry, the domain⇄event maps, the message
//! router, and the transport pipeline events pass through before they are
//! persisted and dispatched to domain handlers.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod domain_map;
pub mod handlers;
#[cfg(test)]
mod test_support;
pub mod pipeline;
mod registry;
mod router;

pub use domain_map::DomainEventMap;
pub use pipeline::{EventSink, StageDecision, StageOutput, TransportPipeline, TransportStage};
pub use registry::{EventProcessor, HandlerError, HandlerRegistry};
pub use router::{InboundMessage, MessageRouter};
