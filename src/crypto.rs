// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Authenticated encryption of bucket blobs.
//!
//! The hook is decoupled from the ORAM engine so the engine remains testable
//! without a key. The backend only ever sees `nonce || ciphertext`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use thiserror::Error;

/// Length in bytes of the AES-256-GCM key.
pub const KEY_LENGTH: usize = 32;

/// Length in bytes of the random nonce prepended to each ciphertext.
pub const NONCE_LENGTH: usize = 12;

/// Returned when a bucket blob cannot be encrypted or decrypted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The ciphertext is shorter than its nonce prefix.
    #[error("ciphertext shorter than the {NONCE_LENGTH}-byte nonce prefix")]
    TruncatedCiphertext,

    /// The ciphertext failed authentication (tampered or wrong key).
    #[error("authenticated decryption failed")]
    AuthenticationFailure,

    /// The cipher rejected the plaintext.
    #[error("encryption failed")]
    EncryptionFailure,
}

/// AES-256-GCM wrapper holding the client's key for the engine's lifetime.
pub struct EncryptionEngine {
    cipher: Aes256Gcm,
}

impl EncryptionEngine {
    /// Instantiates the engine from a 32-byte key.
    pub fn new(key: &[u8; KEY_LENGTH]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypts `plaintext` under a fresh random nonce, returning
    /// `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| CryptoError::EncryptionFailure)?;

        let mut output = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Decrypts `nonce || ciphertext`, authenticating the whole blob.
    pub fn decrypt(&self, bytes: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if bytes.len() < NONCE_LENGTH {
            return Err(CryptoError::TruncatedCiphertext);
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LENGTH);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::AuthenticationFailure)
    }
}

impl fmt::Debug for EncryptionEngine {
    // The key must never appear in logs or panic messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionEngine")
    }
}
