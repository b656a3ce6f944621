// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud-facing networking: the HTTP session pool, the request builder, the
//! exponential retry helper, and the typed cloud API contracts (activation,
//! auth token, connection health).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod backoff;
mod connector;
mod error;
mod request;
mod session;
mod ssl;

pub use backoff::ExponentialBackoff;
pub use connector::{
    ActivationRequest, ActivationResponse, AuthRequest, AuthResponse, CipherMode, CloudConnector,
    HealthCheckResponse, IdentityCipher,
};
pub use error::HttpErrorCode;
pub use request::{HttpRequest, HttpResponse};
pub use session::{
    HttpSession, ProxySetting, SessionConfig, SessionFactory, SessionLease, SessionPool,
    MAX_SESSIONS,
};
pub use ssl::SslAttributes;
