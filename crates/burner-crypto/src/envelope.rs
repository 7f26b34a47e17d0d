//! Payload encryption using AES-256-GCM.
//!
//! All functions are pure - the nonce must be provided by the caller from a
//! cryptographically secure source. A nonce must never repeat under the same
//! key.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};

use crate::{error::CryptoError, handshake::SharedSecret};

/// AES-GCM nonce size (96 bits).
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size (16 bytes).
const GCM_TAG_SIZE: usize = 16;

/// Nonce and authenticated ciphertext for one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// The 12-byte AES-GCM nonce
    pub nonce: [u8; NONCE_SIZE],
    /// The ciphertext including the 16-byte GCM tag
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Reassemble an envelope from decoded wire parts.
    ///
    /// # Errors
    ///
    /// - `InvalidNonce`: nonce is not exactly [`NONCE_SIZE`] bytes
    pub fn from_parts(nonce: &[u8], ciphertext: Vec<u8>) -> Result<Self, CryptoError> {
        let nonce: [u8; NONCE_SIZE] = nonce
            .try_into()
            .map_err(|_| CryptoError::InvalidNonce { expected: NONCE_SIZE, actual: nonce.len() })?;

        Ok(Self { nonce, ciphertext })
    }

    /// Plaintext length (ciphertext length minus authentication tag).
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(GCM_TAG_SIZE)
    }
}

/// Encrypt a payload under the session key.
///
/// # Security
///
/// - Caller MUST provide a fresh random nonce per call
/// - Authenticated encryption: any modification is detected by [`open`]
pub fn seal(secret: &SharedSecret, plaintext: &[u8], nonce: [u8; NONCE_SIZE]) -> Envelope {
    let cipher = Aes256Gcm::new(secret.key().into());

    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&nonce), plaintext) else {
        unreachable!("AES-256-GCM encryption cannot fail below the 64 GiB plaintext limit");
    };

    Envelope { nonce, ciphertext }
}

/// Decrypt and authenticate a payload.
///
/// # Errors
///
/// - `DecryptionFailed`: wrong key, tampered nonce, ciphertext or tag
pub fn open(secret: &SharedSecret, envelope: &Envelope) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(secret.key().into());

    cipher
        .decrypt(Nonce::from_slice(&envelope.nonce), envelope.ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)
}
