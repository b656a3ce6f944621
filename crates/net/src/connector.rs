// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed cloud API contracts: device activation, auth-token fetch, and
//! connection health check.

use crate::error::HttpErrorCode;
use crate::request::{HttpRequest, HttpResponse};
use crate::session::SessionPool;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::DateTime;
use ignite_core::{rng, Clock};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const QUALIFIER_DELIMITER: &str = "-delim-";

/// Qualifier encryption mode, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    AesGcm,
    AesCbc,
}

/// Identity-material collaborator: key derivation and qualifier encryption.
///
/// The cryptographic primitives live outside this crate; the connector only
/// needs the derived key and the base64 ciphertext.
pub trait IdentityCipher: Send + Sync {
    fn derive_key(&self, vin: &str, serial: &str) -> Vec<u8>;

    fn encrypt(
        &self,
        key: &[u8],
        plaintext: &str,
        mode: CipherMode,
        aad: Option<&str>,
    ) -> Result<String, HttpErrorCode>;
}

/// Parameters of an activation attempt.
#[derive(Debug, Clone, Default)]
pub struct ActivationRequest {
    pub serial_number: String,
    pub imei: String,
    pub vin: String,
    pub hw_version: String,
    pub sw_version: String,
    pub product_type: String,
    pub device_type: Option<String>,
    pub use_device_type: bool,
}

/// Outcome of an activation attempt.
#[derive(Debug, Clone, Default)]
pub struct ActivationResponse {
    pub code: HttpErrorCode,
    pub http_status: u16,
    pub device_id: String,
    pub passcode: String,
    pub response_body: String,
}

/// Parameters of a token fetch.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub login: String,
    pub passcode: String,
    pub product_type: Option<String>,
}

/// Outcome of a token fetch.
#[derive(Debug, Clone, Default)]
pub struct AuthResponse {
    pub code: HttpErrorCode,
    pub http_status: u16,
    pub token: String,
    /// Issued-at from the token payload, epoch seconds.
    pub issued_at: u64,
    /// `exp - iat`, seconds.
    pub token_ttl: u64,
    /// Server `Date` header as `YYYY-MM-DDTHH:MM:SS`.
    pub login_time: String,
    pub response_body: String,
}

#[derive(Debug, Clone, Default)]
pub struct HealthCheckResponse {
    pub code: HttpErrorCode,
    pub http_status: u16,
}

/// Cloud endpoints the agent talks to over the session pool.
pub struct CloudConnector {
    pool: Arc<SessionPool>,
    cipher: Arc<dyn IdentityCipher>,
    clock: Arc<dyn Clock>,
    activation_url: String,
    auth_url: String,
    health_url: String,
    cipher_mode: CipherMode,
}

impl CloudConnector {
    pub fn new(
        pool: Arc<SessionPool>,
        cipher: Arc<dyn IdentityCipher>,
        clock: Arc<dyn Clock>,
        cipher_mode: CipherMode,
    ) -> Self {
        Self {
            pool,
            cipher,
            clock,
            activation_url: String::new(),
            auth_url: String::new(),
            health_url: String::new(),
            cipher_mode,
        }
    }

    pub fn set_activation_url(&mut self, url: &str) {
        self.activation_url = url.to_string();
    }

    pub fn set_auth_url(&mut self, url: &str) {
        self.auth_url = url.to_string();
    }

    pub fn set_health_check_url(&mut self, url: &str) {
        self.health_url = url.to_string();
    }

    /// One-time identity exchange: proves possession of `(vin, serial)` and
    /// receives a device id and passcode.
    pub async fn activate(&self, request: &ActivationRequest) -> ActivationResponse {
        let qualifier = match self.build_qualifier(request) {
            Ok(qualifier) => qualifier,
            Err(code) => return ActivationResponse { code, ..ActivationResponse::default() },
        };

        let mut payload = json!({
            "productType": request.product_type,
            "vin": request.vin,
            "serialNumber": request.serial_number,
            "imei": request.imei,
            "HW-Version": request.hw_version,
            "SW-Version": request.sw_version,
            "qualifier": qualifier,
        });
        if request.use_device_type {
            if let Some(device_type) = &request.device_type {
                payload["deviceType"] = json!(device_type);
            }
        }
        if self.cipher_mode == CipherMode::AesGcm {
            payload["aad"] = json!(request.serial_number);
        }

        let response = self.post_json(&self.activation_url, payload.to_string()).await;
        let code = response.code;
        if !code.is_ok() {
            warn!(status = response.status, %code, "activation request failed");
            return ActivationResponse {
                code,
                http_status: response.status,
                response_body: response.body,
                ..ActivationResponse::default()
            };
        }

        parse_activation_body(response)
    }

    /// Fetch an auth token with the device credentials.
    pub async fn get_auth_token(&self, request: &AuthRequest) -> AuthResponse {
        let basic =
            STANDARD.encode(format!("{}:{}", request.login, request.passcode).as_bytes());
        let body = match &request.product_type {
            Some(product_type) => json!({ "productType": product_type }).to_string(),
            None => "{}".to_string(),
        };

        let Some(lease) = self.pool.acquire() else {
            return AuthResponse { code: HttpErrorCode::Backoff, ..AuthResponse::default() };
        };
        let response = HttpRequest::new(&self.auth_url)
            .header("Authorization", &format!("Basic {basic}"))
            .header("Content-Type", "application/json")
            .post_fields(body)
            .execute(lease.session())
            .await;
        self.pool.release(lease);

        // Credential rejections on the token endpoint are token errors, not
        // generic access errors.
        let code = match response.code {
            HttpErrorCode::Access => HttpErrorCode::Token,
            other => other,
        };
        if !code.is_ok() {
            warn!(status = response.status, %code, "token request failed");
            return AuthResponse {
                code,
                http_status: response.status,
                response_body: response.body,
                ..AuthResponse::default()
            };
        }

        parse_auth_body(response)
    }

    /// Cheap reachability probe against the health endpoint.
    pub async fn health_check(&self) -> HealthCheckResponse {
        let Some(lease) = self.pool.acquire() else {
            return HealthCheckResponse { code: HttpErrorCode::Backoff, http_status: 0 };
        };
        let response = HttpRequest::new(&self.health_url).execute_get(lease.session()).await;
        self.pool.release(lease);

        debug!(status = response.status, code = %response.code, "health check");
        HealthCheckResponse { code: response.code, http_status: response.status }
    }

    fn build_qualifier(&self, request: &ActivationRequest) -> Result<String, HttpErrorCode> {
        if request.serial_number.is_empty() || request.vin.is_empty() {
            return Err(HttpErrorCode::InvalidInput);
        }

        let entropy = (self.clock.epoch_ms() / 1000.0) as u64;
        let nonce = rng::draw_up_to(&request.serial_number, entropy, 9_999);
        let plaintext = format!(
            "{vin}{delim}{serial}{delim}{nonce}",
            vin = request.vin,
            serial = request.serial_number,
            delim = QUALIFIER_DELIMITER,
        );

        let key = self.cipher.derive_key(&request.vin, &request.serial_number);
        let aad = match self.cipher_mode {
            CipherMode::AesGcm => Some(request.serial_number.as_str()),
            CipherMode::AesCbc => None,
        };
        self.cipher.encrypt(&key, &plaintext, self.cipher_mode, aad)
    }

    async fn post_json(&self, url: &str, body: String) -> HttpResponse {
        let Some(lease) = self.pool.acquire() else {
            return HttpResponse { code: HttpErrorCode::Backoff, ..HttpResponse::default() };
        };
        let response = HttpRequest::new(url)
            .header("Content-Type", "application/json")
            .post_fields(body)
            .execute(lease.session())
            .await;
        self.pool.release(lease);
        response
    }
}

/// Activation responses come in two shapes: v2 `{deviceId, passcode}` and
/// v4 `{message: "Success", data: {deviceId, passcode}}`.
fn parse_activation_body(response: HttpResponse) -> ActivationResponse {
    let parsed: Value = match serde_json::from_str(&response.body) {
        Ok(parsed) => parsed,
        Err(_) => {
            return ActivationResponse {
                code: HttpErrorCode::ResponseFormat,
                http_status: response.status,
                response_body: response.body,
                ..ActivationResponse::default()
            }
        }
    };

    let record = if parsed.get("data").is_some() {
        if parsed.get("message").and_then(Value::as_str) != Some("Success") {
            return ActivationResponse {
                code: HttpErrorCode::ResponseData,
                http_status: response.status,
                response_body: response.body,
                ..ActivationResponse::default()
            };
        }
        &parsed["data"]
    } else {
        &parsed
    };

    let device_id = string_field(record, &["deviceId", "deviceID"]);
    let passcode = string_field(record, &["passcode"]);
    if device_id.is_empty() || passcode.is_empty() {
        return ActivationResponse {
            code: HttpErrorCode::ResponseData,
            http_status: response.status,
            response_body: response.body,
            ..ActivationResponse::default()
        };
    }

    info!(%device_id, "device activated");
    ActivationResponse {
        code: HttpErrorCode::Ok,
        http_status: response.status,
        device_id,
        passcode,
        response_body: response.body,
    }
}

fn parse_auth_body(response: HttpResponse) -> AuthResponse {
    let parsed: Value = match serde_json::from_str(&response.body) {
        Ok(parsed) => parsed,
        Err(_) => {
            return AuthResponse {
                code: HttpErrorCode::ResponseFormat,
                http_status: response.status,
                response_body: response.body,
                ..AuthResponse::default()
            }
        }
    };

    let token = string_field(&parsed, &["accessToken", "access_token", "token"]);
    let Some((issued_at, expires_at)) = decode_token_times(&token) else {
        return AuthResponse {
            code: HttpErrorCode::ResponseData,
            http_status: response.status,
            response_body: response.body,
            ..AuthResponse::default()
        };
    };

    let login_time = response
        .header("date")
        .and_then(|raw| DateTime::parse_from_rfc2822(raw).ok())
        .map(|parsed| parsed.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_default();

    AuthResponse {
        code: HttpErrorCode::Ok,
        http_status: response.status,
        token,
        issued_at,
        token_ttl: expires_at.saturating_sub(issued_at),
        login_time,
        response_body: response.body,
    }
}

/// `iat`/`exp` from the middle segment of a dot-separated token.
fn decode_token_times(token: &str) -> Option<(u64, u64)> {
    let mut segments = token.split('.');
    let (_, payload) = (segments.next()?, segments.next()?);
    let decoded = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Value = serde_json::from_slice(&decoded).ok()?;
    let issued_at = claims.get("iat")?.as_u64()?;
    let expires_at = claims.get("exp")?.as_u64()?;
    Some((issued_at, expires_at))
}

fn string_field(record: &Value, names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| record.get(*name).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
#[path = "connector_tests.rs"]
mod tests;
