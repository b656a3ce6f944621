// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reusable HTTP session pool.
//!
//! A fixed array of lazily-built sessions over `reqwest` clients. Callers
//! acquire a lease, execute requests, and release; sessions are never
//! destroyed by callers. A session that reported a transport error is
//! disposed on release and rebuilt on its next acquire.

use crate::error::HttpErrorCode;
use crate::ssl::SslAttributes;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Pool cardinality.
pub const MAX_SESSIONS: usize = 8;

/// Occupancy at which the one-shot warning fires.
const WARN_THRESHOLD: usize = MAX_SESSIONS - 2;

/// Transport settings shared by every pooled session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ssl: SslAttributes,
    pub proxy: Option<ProxySetting>,
    /// Advisory local source-port range; honored by external factories.
    pub local_port_range: Option<(u16, u16)>,
    pub default_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ssl: SslAttributes::default(),
            proxy: None,
            local_port_range: None,
            default_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxySetting {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// One reusable transport handle.
///
/// The underlying client is swappable so proxy or port-range changes reach
/// sessions that are currently acquired, not just future ones.
pub struct HttpSession {
    client: ArcSwap<Client>,
    last_error: Mutex<HttpErrorCode>,
}

impl HttpSession {
    pub fn new(client: Client) -> Self {
        Self { client: ArcSwap::from_pointee(client), last_error: Mutex::new(HttpErrorCode::Ok) }
    }

    pub fn client(&self) -> Arc<Client> {
        self.client.load_full()
    }

    /// Swap in a reconfigured client; in-flight requests finish on the old one.
    pub fn replace_client(&self, client: Client) {
        self.client.store(Arc::new(client));
    }

    /// Record the outcome of the last exchange on this session.
    pub fn record_outcome(&self, code: HttpErrorCode) {
        *self.last_error.lock() = code;
    }

    pub fn last_error(&self) -> HttpErrorCode {
        *self.last_error.lock()
    }
}

/// Embedder-supplied session construction, replacing the built-in one.
pub trait SessionFactory: Send + Sync {
    fn build(&self, config: &SessionConfig) -> Result<HttpSession, HttpErrorCode>;
}

/// An acquired pool slot. Return it with [`SessionPool::release`].
pub struct SessionLease {
    slot: usize,
    session: Arc<HttpSession>,
}

impl SessionLease {
    pub fn session(&self) -> &HttpSession {
        &self.session
    }
}

struct PoolState {
    config: SessionConfig,
    slots: Vec<Option<Arc<HttpSession>>>,
    held: Vec<bool>,
    acquired: usize,
    warning_armed: bool,
    factory: Option<Arc<dyn SessionFactory>>,
}

/// Bounded pool of reusable HTTP sessions.
pub struct SessionPool {
    inner: Mutex<PoolState>,
    warning_hook: Mutex<Option<Box<dyn Fn(usize) + Send + Sync>>>,
}

impl SessionPool {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            inner: Mutex::new(PoolState {
                config,
                slots: (0..MAX_SESSIONS).map(|_| None).collect(),
                held: vec![false; MAX_SESSIONS],
                acquired: 0,
                warning_armed: true,
                factory: None,
            }),
            warning_hook: Mutex::new(None),
        }
    }

    /// Called once each time occupancy crosses the warning threshold.
    pub fn set_warning_hook(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.warning_hook.lock() = Some(Box::new(hook));
    }

    /// First free slot, building the session lazily. `None` when exhausted.
    pub fn acquire(&self) -> Option<SessionLease> {
        let (lease, warn_at) = {
            let mut state = self.inner.lock();
            let slot = (0..MAX_SESSIONS).find(|&i| !state.held[i])?;

            if state.slots[slot].is_none() {
                match build_session(&state.config, state.factory.as_deref()) {
                    Ok(session) => state.slots[slot] = Some(Arc::new(session)),
                    Err(code) => {
                        warn!(%code, slot, "session construction failed");
                        return None;
                    }
                }
            }

            state.held[slot] = true;
            state.acquired += 1;

            let warn_at = if state.acquired >= WARN_THRESHOLD && state.warning_armed {
                state.warning_armed = false;
                Some(state.acquired)
            } else {
                None
            };

            let session = Arc::clone(state.slots[slot].as_ref()?);
            (SessionLease { slot, session }, warn_at)
        };

        if let Some(acquired) = warn_at {
            warn!(acquired, max = MAX_SESSIONS, "session pool nearing exhaustion");
            if let Some(hook) = &*self.warning_hook.lock() {
                hook(acquired);
            }
        }

        Some(lease)
    }

    /// Return a session to the pool.
    ///
    /// A session whose last exchange failed at the transport is dropped so
    /// the slot rebuilds on next acquire (stuck handles don't get reused).
    pub fn release(&self, lease: SessionLease) {
        let mut state = self.inner.lock();
        let SessionLease { slot, session } = lease;

        if state.held[slot] {
            state.held[slot] = false;
            state.acquired -= 1;
        }
        if state.acquired < WARN_THRESHOLD {
            state.warning_armed = true;
        }

        if !session.last_error().is_ok() {
            debug!(slot, error = %session.last_error(), "disposing errored session");
            state.slots[slot] = None;
        }
    }

    /// Route new and existing sessions through a proxy, acquired ones
    /// included.
    pub fn set_proxy(&self, host: &str, port: u16, user: Option<&str>, password: Option<&str>) {
        let mut state = self.inner.lock();
        state.config.proxy = Some(ProxySetting {
            host: host.to_string(),
            port,
            user: user.map(str::to_string),
            password: password.map(str::to_string),
        });
        apply_config_live(&mut state);
    }

    pub fn set_local_port_range(&self, start: u16, end: u16) {
        let mut state = self.inner.lock();
        state.config.local_port_range = Some((start, end));
        apply_config_live(&mut state);
    }

    /// Replace the built-in session construction.
    pub fn set_external_factory(&self, factory: Arc<dyn SessionFactory>) {
        let mut state = self.inner.lock();
        state.factory = Some(factory);
        apply_config_live(&mut state);
    }

    pub fn acquired_count(&self) -> usize {
        self.inner.lock().acquired
    }

    pub fn default_timeout(&self) -> Duration {
        self.inner.lock().config.default_timeout
    }
}

/// Push the new transport settings into every existing session. Built-in
/// sessions get their client swapped in place (acquired sessions pick the
/// change up on their next request); factory-built sessions in free slots
/// are dropped so the factory rebuilds them on next acquire.
fn apply_config_live(state: &mut PoolState) {
    if state.factory.is_some() {
        for i in 0..MAX_SESSIONS {
            if !state.held[i] {
                state.slots[i] = None;
            }
        }
        return;
    }

    for session in state.slots.iter().flatten() {
        match build_client(&state.config) {
            Ok(client) => session.replace_client(client),
            Err(code) => warn!(%code, "could not reconfigure session"),
        }
    }
}

fn build_session(
    config: &SessionConfig,
    factory: Option<&dyn SessionFactory>,
) -> Result<HttpSession, HttpErrorCode> {
    if let Some(factory) = factory {
        return factory.build(config);
    }
    Ok(HttpSession::new(build_client(config)?))
}

fn build_client(config: &SessionConfig) -> Result<Client, HttpErrorCode> {
    let mut builder = Client::builder().timeout(config.default_timeout);
    builder = config.ssl.apply(builder);

    if let Some(proxy) = &config.proxy {
        let url = format!("http://{}:{}", proxy.host, proxy.port);
        let mut proxy_setting =
            reqwest::Proxy::all(&url).map_err(|_| HttpErrorCode::InvalidInput)?;
        if let (Some(user), Some(password)) = (&proxy.user, &proxy.password) {
            proxy_setting = proxy_setting.basic_auth(user, password);
        }
        builder = builder.proxy(proxy_setting);
    }

    if let Some((start, end)) = config.local_port_range {
        debug!(start, end, "local port range recorded (built-in transport picks ephemeral ports)");
    }

    builder.build().map_err(|error| {
        warn!(%error, "client build failed");
        HttpErrorCode::Other
    })
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
