// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shutdown orchestration.
//!
//! Long-running receivers register here; on shutdown each must return from
//! its blocking work, release resources, and report ready within the grace
//! period. After that the process exits with the requested exit type.

use ignite_core::ExitType;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const RECEIVER_IPC: &str = "IpcReceiver";
pub const RECEIVER_ROUTER: &str = "RouterReceiver";
pub const RECEIVER_CONTROLLER: &str = "ActivationController";

/// How the process should leave once teardown completes.
#[derive(Debug, Clone, Copy)]
pub struct ExitRequest {
    pub exit_type: ExitType,
    pub code: i32,
}

/// Shutdown registry and exit gate, one per process.
pub struct Lifecycle {
    registered: Mutex<HashSet<String>>,
    ready: Mutex<HashSet<String>>,
    all_ready: Notify,
    cancel: CancellationToken,
    exit: Mutex<Option<ExitRequest>>,
    exit_requested: Notify,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            registered: Mutex::new(HashSet::new()),
            ready: Mutex::new(HashSet::new()),
            all_ready: Notify::new(),
            cancel: CancellationToken::new(),
            exit: Mutex::new(None),
            exit_requested: Notify::new(),
        }
    }

    /// Register a receiver that must acknowledge shutdown.
    pub fn register(&self, receiver: &str) {
        self.registered.lock().insert(receiver.to_string());
    }

    /// Cancellation signal receivers select on.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Begin shutdown: every receiver's blocking work should unblock now.
    pub fn notify_shutdown(&self) {
        info!("shutdown notified");
        self.cancel.cancel();
    }

    /// A receiver has released its resources.
    pub fn ready_for_shutdown(&self, receiver: &str) {
        info!(receiver, "ready for shutdown");
        self.ready.lock().insert(receiver.to_string());

        let registered = self.registered.lock();
        let ready = self.ready.lock();
        if registered.is_subset(&ready) {
            self.all_ready.notify_waiters();
        }
    }

    /// Wait until every registered receiver reported ready, bounded by the
    /// grace period. `false` on timeout.
    pub async fn wait_all_ready(&self, grace: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + grace;
        loop {
            // Register as a waiter before checking, so a notification landing
            // between the check and the await is not lost.
            let notified = self.all_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.everyone_ready() {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                if self.everyone_ready() {
                    return true;
                }
                let registered = self.registered.lock();
                let ready = self.ready.lock();
                let missing: Vec<&String> = registered.difference(&ready).collect();
                warn!(?missing, "grace period expired with receivers pending");
                return false;
            }
        }
    }

    fn everyone_ready(&self) -> bool {
        let registered = self.registered.lock();
        let ready = self.ready.lock();
        registered.is_subset(&ready)
    }

    /// Ask the main loop to exit. First request wins.
    pub fn request_exit(&self, request: ExitRequest) {
        let mut exit = self.exit.lock();
        if exit.is_none() {
            *exit = Some(request);
            self.exit_requested.notify_waiters();
        }
    }

    /// Block until an exit is requested.
    pub async fn wait_exit(&self) -> ExitRequest {
        loop {
            let notified = self.exit_requested.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(request) = *self.exit.lock() {
                return request;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
