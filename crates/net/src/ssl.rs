// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TLS attributes applied to outbound sessions.

use reqwest::{Certificate, ClientBuilder, Identity};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// TLS configuration for cloud sessions, sourced from the agent config.
#[derive(Debug, Clone, Default)]
pub struct SslAttributes {
    pub verify_peer: bool,
    pub verify_host: bool,
    /// PEM bundle of trusted roots.
    pub ca_file: Option<PathBuf>,
    /// Directory of trusted roots (each file a PEM bundle).
    pub ca_path: Option<PathBuf>,
    /// Client certificate + key, PEM, concatenated or separate files.
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    /// "PEM" is the only supported value; recorded for config parity.
    pub cert_type: Option<String>,
    pub key_type: Option<String>,
    /// Engine-backed keys are the embedder's business via the session factory.
    pub tls_engine_id: Option<String>,
}

impl SslAttributes {
    /// Apply these attributes to a client builder.
    ///
    /// Unreadable cert material is logged and skipped rather than failing
    /// the whole session; the server will reject the handshake if the
    /// material was required.
    pub fn apply(&self, mut builder: ClientBuilder) -> ClientBuilder {
        if !self.verify_peer || !self.verify_host {
            builder = builder.danger_accept_invalid_certs(true);
        }

        for root in self.root_bundles() {
            match Certificate::from_pem(&root) {
                Ok(cert) => builder = builder.add_root_certificate(cert),
                Err(error) => warn!(%error, "skipping unparseable CA certificate"),
            }
        }

        if let Some(identity) = self.identity() {
            builder = builder.identity(identity);
        }

        builder
    }

    fn root_bundles(&self) -> Vec<Vec<u8>> {
        let mut bundles = Vec::new();
        if let Some(file) = &self.ca_file {
            match fs::read(file) {
                Ok(pem) => bundles.push(pem),
                Err(error) => warn!(path = %file.display(), %error, "cannot read CA file"),
            }
        }
        if let Some(dir) = &self.ca_path {
            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.flatten() {
                    if let Ok(pem) = fs::read(entry.path()) {
                        bundles.push(pem);
                    }
                }
            }
        }
        bundles
    }

    fn identity(&self) -> Option<Identity> {
        let cert_file = self.cert_file.as_ref()?;
        let mut pem = match fs::read(cert_file) {
            Ok(pem) => pem,
            Err(error) => {
                warn!(path = %cert_file.display(), %error, "cannot read client certificate");
                return None;
            }
        };
        if let Some(key_file) = &self.key_file {
            match fs::read(key_file) {
                Ok(mut key) => pem.append(&mut key),
                Err(error) => {
                    warn!(path = %key_file.display(), %error, "cannot read client key");
                    return None;
                }
            }
        }
        match Identity::from_pem(&pem) {
            Ok(identity) => Some(identity),
            Err(error) => {
                warn!(%error, "client identity unusable");
                None
            }
        }
    }
}
