// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel-backed bridges between synchronous subsystems and async tasks.
//!
//! Subsystems emit synthesized events (and host-bound messages) from
//! ordinary call stacks; dedicated tasks drain the queues so nothing ever
//! re-enters the router or blocks on socket I/O mid-dispatch.

use ignite_core::{Event, EventEmitter};
use ignite_ipc::MessageOut;
use ignite_router::handlers::DeviceMessenger;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

/// Event sink feeding the router's intake queue.
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelEmitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventEmitter for ChannelEmitter {
    fn emit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            warn!("router intake closed, event lost");
        }
    }
}

/// Host-bound message sink feeding the dispatcher task.
pub struct QueuedMessenger {
    tx: mpsc::UnboundedSender<(MessageOut, Value)>,
}

impl QueuedMessenger {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<(MessageOut, Value)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, message: MessageOut, payload: Value) -> bool {
        self.tx.send((message, payload)).is_ok()
    }
}

impl DeviceMessenger for QueuedMessenger {
    fn deliver_remote_operation(&self, payload: &str) -> bool {
        match serde_json::from_str::<Value>(payload) {
            Ok(parsed) => self.send(MessageOut::RemoteOperationMessage, parsed),
            Err(error) => {
                warn!(%error, "unserializable remote operation payload");
                false
            }
        }
    }
}
