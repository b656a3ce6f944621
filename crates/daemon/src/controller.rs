// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activation/auth controller loop.
//!
//! Polls the backoff gate; when it opens, drives one activation attempt (or
//! a token refresh once activated) and reports the outcome back to the
//! backoff machine. Network-shaped failures are reported too; the machine
//! knows not to count them.

use crate::lifecycle::{Lifecycle, RECEIVER_CONTROLLER};
use ignite_auth::{ActivationBackoff, TokenManager};
use ignite_net::CloudConnector;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ActivationController {
    pub backoff: Arc<ActivationBackoff>,
    pub token_manager: Arc<TokenManager>,
    pub connector: Arc<CloudConnector>,
    pub lifecycle: Arc<Lifecycle>,
    pub poll_interval: Duration,
}

impl ActivationController {
    /// Run until shutdown; reports ready on the way out.
    pub async fn run(self) {
        let cancel = self.lifecycle.cancel_token();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            if self.token_manager.is_activated() {
                // Keep the token warm; get_token is a no-op while fresh.
                if let Err(code) = self.token_manager.get_token().await {
                    warn!(%code, "token refresh failed");
                }
                continue;
            }

            if !self.backoff.proceed() {
                debug!("backoff gate closed");
                continue;
            }

            info!("starting activation attempt");
            let code = self.token_manager.activate().await;
            if code.is_network_related() {
                // Distinguish "cloud is down" from "we are offline".
                let health = self.connector.health_check().await;
                info!(health = %health.code, status = health.http_status, "connectivity probe");
            }
            self.backoff.calculate_next_retry(code);
        }

        self.lifecycle.ready_for_shutdown(RECEIVER_CONTROLLER);
    }
}
