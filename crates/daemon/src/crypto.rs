// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in identity cipher for the activation qualifier.
//!
//! AES-256-GCM with a key derived from `(vin, serial)`. Deployments that
//! require AES-CBC (or hardware-backed keys) supply their own
//! `IdentityCipher` when constructing the connector.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ignite_net::{CipherMode, HttpErrorCode, IdentityCipher};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use tracing::warn;

const NONCE_LEN: usize = 12;

/// AES-GCM qualifier cipher.
#[derive(Default)]
pub struct GcmIdentityCipher;

impl IdentityCipher for GcmIdentityCipher {
    fn derive_key(&self, vin: &str, serial: &str) -> Vec<u8> {
        Sha256::digest(format!("{vin}:{serial}").as_bytes()).to_vec()
    }

    fn encrypt(
        &self,
        key: &[u8],
        plaintext: &str,
        mode: CipherMode,
        aad: Option<&str>,
    ) -> Result<String, HttpErrorCode> {
        if mode == CipherMode::AesCbc {
            warn!("built-in cipher is GCM-only; supply an external cipher for CBC");
            return Err(HttpErrorCode::InvalidInput);
        }

        let unbound =
            UnboundKey::new(&AES_256_GCM, key).map_err(|_| HttpErrorCode::InvalidInput)?;
        let sealing_key = LessSafeKey::new(unbound);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce_bytes)
            .map_err(|_| HttpErrorCode::Other)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut sealed = plaintext.as_bytes().to_vec();
        sealing_key
            .seal_in_place_append_tag(
                nonce,
                Aad::from(aad.unwrap_or_default().as_bytes()),
                &mut sealed,
            )
            .map_err(|_| HttpErrorCode::Other)?;

        let mut wire = Vec::with_capacity(NONCE_LEN + sealed.len());
        wire.extend_from_slice(&nonce_bytes);
        wire.extend_from_slice(&sealed);
        Ok(STANDARD.encode(wire))
    }
}
