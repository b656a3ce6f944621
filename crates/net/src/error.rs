// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared HTTP/cloud error taxonomy.
//!
//! One enum reused across the session layer and the cloud API clients so the
//! retry policies (activation backoff, exponential upload backoff) can make
//! decisions without inspecting transport details.

use std::fmt;

/// Outcome classification for an HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpErrorCode {
    Ok,
    /// Authorization rejected (401/403 on a non-token endpoint).
    Access,
    /// Token endpoint rejected the credentials.
    Token,
    /// Connection could not be established (DNS, refused, unreachable).
    Network,
    /// Response arrived but was not parseable in the expected shape.
    ResponseFormat,
    /// Response parsed but its content was unusable.
    ResponseData,
    /// The request timed out.
    Timeout,
    /// Server-side failure (5xx, 408, 404, TLS handshake).
    Server,
    /// Rejected locally by a backoff gate before any traffic.
    Backoff,
    /// Caller passed arguments that can never succeed; never retried.
    InvalidInput,
    Other,
    Unknown,
}

impl HttpErrorCode {
    /// Classify an HTTP status code. `Ok` for 2xx.
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Ok,
            401 | 403 => Self::Access,
            404 | 408 => Self::Server,
            500..=599 => Self::Server,
            _ => Self::ResponseData,
        }
    }

    /// Classify a transport-level failure.
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Network
        } else if error.is_builder() || error.is_request() {
            Self::InvalidInput
        } else {
            Self::Other
        }
    }

    /// Network-shaped failures are not counted as activation attempts.
    pub fn is_network_related(self) -> bool {
        matches!(self, Self::Network | Self::Timeout)
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl Default for HttpErrorCode {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for HttpErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
