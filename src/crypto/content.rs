// ABOUTME: AES-256-GCM encryption for message content stored in the database
// ABOUTME: Single shared key derived from a passphrase; ciphertext stored as nonce || ciphertext
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit};
use rand::RngCore;
use relay_core::errors::DatabaseError;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

const NONCE_LEN: usize = 12;

/// Encrypts and decrypts message content with one tenant-independent key
#[derive(Clone)]
pub struct ContentCipher {
    key: Zeroizing<[u8; 32]>,
}

impl ContentCipher {
    /// Derive the content key as SHA-256 of the passphrase
    #[must_use]
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Encrypt UTF-8 content
    ///
    /// # Errors
    ///
    /// Returns an error if the AEAD operation fails
    pub fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, DatabaseError> {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(self.key.as_slice()));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| DatabaseError::Encryption(format!("encrypt: {e}")))?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt content produced by [`Self::encrypt`]
    ///
    /// # Errors
    ///
    /// Returns an error if the data is truncated, was encrypted under another
    /// key, or is not valid UTF-8
    pub fn decrypt(&self, encrypted: &[u8]) -> Result<String, DatabaseError> {
        if encrypted.len() < NONCE_LEN {
            return Err(DatabaseError::Encryption(
                "encrypted data too short".to_owned(),
            ));
        }

        let cipher = Aes256Gcm::new(GenericArray::from_slice(self.key.as_slice()));
        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(GenericArray::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| DatabaseError::Encryption(format!("decrypt: {e}")))?;

        String::from_utf8(plaintext).map_err(|e| DatabaseError::InvalidData(e.to_string()))
    }
}

impl fmt::Debug for ContentCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
