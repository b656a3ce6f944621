// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device credentials and auth-token lifecycle.
//!
//! Drives activation (once) and token fetches (periodically) through the
//! cloud connector, caching the token until its TTL margin runs out.

use crate::state::{ActivationFailureReason, ActivationState};
use ignite_core::store::keys;
use ignite_core::{Clock, Event, EventEmitter, KvStore, ProductInfo};
use ignite_net::{ActivationRequest, AuthRequest, CloudConnector, HttpErrorCode};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

const DUMMY_VIN: &str = "NA";

/// A fetched token and its freshness window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    /// Epoch seconds.
    pub issued_at: u64,
    /// Seconds.
    pub ttl: u64,
    /// Percentage of the TTL treated as already spent.
    pub margin_percent: u64,
}

impl AuthToken {
    /// `now < issued_at + ttl * (1 - margin/100)`
    pub fn is_fresh(&self, now_epoch_s: u64) -> bool {
        let usable = self.ttl.saturating_mul(100 - self.margin_percent.min(100)) / 100;
        now_epoch_s < self.issued_at + usable
    }
}

/// Owns the activate → token-fetch flow and the cached token.
pub struct TokenManager {
    connector: Arc<CloudConnector>,
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    product: Arc<dyn ProductInfo>,
    activation_state: Arc<ActivationState>,
    emitter: Mutex<Option<Arc<dyn EventEmitter>>>,
    product_type: String,
    use_device_type: bool,
    margin_percent: u64,
    token: Mutex<Option<AuthToken>>,
}

impl TokenManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connector: Arc<CloudConnector>,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        product: Arc<dyn ProductInfo>,
        activation_state: Arc<ActivationState>,
        product_type: String,
        use_device_type: bool,
        margin_percent: u64,
    ) -> Self {
        Self {
            connector,
            store,
            clock,
            product,
            activation_state,
            emitter: Mutex::new(None),
            product_type,
            use_device_type,
            margin_percent,
            token: Mutex::new(None),
        }
    }

    pub fn set_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.emitter.lock() = Some(emitter);
    }

    /// Device has a stored id and passcode.
    pub fn is_activated(&self) -> bool {
        self.store.get(keys::LOGIN).is_some_and(|v| !v.is_empty())
            && self.store.get(keys::PASSCODE).is_some_and(|v| !v.is_empty())
    }

    pub fn token_issue_time(&self) -> Option<u64> {
        self.token.lock().as_ref().map(|t| t.issued_at)
    }

    pub fn invalidate_token(&self) {
        *self.token.lock() = None;
        self.activation_state.set_token("");
    }

    /// Drop the stored passcode so the next cycle re-activates.
    pub fn invalidate_passcode(&self) {
        if let Err(error) = self.store.remove(keys::PASSCODE) {
            warn!(%error, "could not clear passcode");
        }
        self.invalidate_token();
    }

    /// One activation attempt; credentials are stored on success.
    pub async fn activate(&self) -> HttpErrorCode {
        let vin = self
            .store
            .get(keys::VIN)
            .filter(|v| !v.is_empty())
            .or_else(|| self.product.vin())
            .unwrap_or_else(|| DUMMY_VIN.to_string());

        let request = ActivationRequest {
            serial_number: self.product.serial_number(),
            imei: self.product.imei(),
            vin,
            hw_version: self.product.hw_version(),
            sw_version: self.product.sw_version(),
            product_type: self.product_type.clone(),
            device_type: self.product.device_type(),
            use_device_type: self.use_device_type,
        };

        let response = self.connector.activate(&request).await;
        if !response.code.is_ok() {
            return response.code;
        }

        let stored = self
            .store
            .set(keys::LOGIN, &response.device_id)
            .and_then(|()| self.store.set(keys::PASSCODE, &response.passcode))
            .and_then(|()| self.store.set(keys::LAST_DEVICE_ID, &response.device_id));
        if let Err(error) = stored {
            warn!(%error, "could not persist device credentials");
            return HttpErrorCode::Other;
        }

        info!(device_id = %response.device_id, "activation complete");
        self.activation_state.set_activation_state(true, ActivationFailureReason::NoError);
        if let Some(emitter) = &*self.emitter.lock() {
            emitter.emit(
                Event::new("1.0", "ActivationEvent")
                    .at(self.clock.epoch_ms(), 0)
                    .with_field("id", response.device_id.as_str()),
            );
        }
        HttpErrorCode::Ok
    }

    /// Current token, fetching (and activating first, if needed) when the
    /// cached one is stale or absent.
    pub async fn get_token(&self) -> Result<String, HttpErrorCode> {
        let now_s = (self.clock.epoch_ms() / 1_000.0) as u64;
        if let Some(token) = &*self.token.lock() {
            if token.is_fresh(now_s) {
                return Ok(token.token.clone());
            }
        }

        if !self.is_activated() {
            let code = self.activate().await;
            if !code.is_ok() {
                return Err(code);
            }
        }

        let request = AuthRequest {
            login: self.store.get(keys::LOGIN).unwrap_or_default(),
            passcode: self.store.get(keys::PASSCODE).unwrap_or_default(),
            product_type: (!self.product_type.is_empty()).then(|| self.product_type.clone()),
        };
        let response = self.connector.get_auth_token(&request).await;

        match response.code {
            HttpErrorCode::Ok => {
                let token = AuthToken {
                    token: response.token.clone(),
                    issued_at: response.issued_at,
                    ttl: response.token_ttl,
                    margin_percent: self.margin_percent,
                };
                *self.token.lock() = Some(token);
                self.activation_state.set_token(&response.token);
                self.activation_state
                    .set_activation_state(true, ActivationFailureReason::NoError);
                Ok(response.token)
            }
            code @ (HttpErrorCode::Token | HttpErrorCode::Access) => {
                // Stored credentials are no longer honored.
                warn!(%code, "credentials rejected, clearing passcode");
                self.invalidate_passcode();
                self.activation_state
                    .set_activation_state(false, ActivationFailureReason::AuthFailure);
                Err(code)
            }
            code => {
                if code.is_network_related() {
                    self.activation_state
                        .set_activation_state(false, ActivationFailureReason::NetworkFailure);
                }
                Err(code)
            }
        }
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
