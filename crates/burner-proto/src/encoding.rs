//! Text-safe form of an encrypted envelope.
//!
//! Ciphertext and nonce travel as standard-alphabet, padded base64 strings in
//! the `data` and `iv` fields of `msg`, `img` and `edit` frames.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::errors::{ProtocolError, Result};

/// Base64 ciphertext and nonce as carried in a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEnvelope {
    /// Base64 ciphertext (including authentication tag)
    pub data: String,
    /// Base64 nonce
    pub iv: String,
}

impl EncodedEnvelope {
    /// Encode raw nonce and ciphertext bytes.
    pub fn encode(nonce: &[u8], ciphertext: &[u8]) -> Self {
        Self { data: STANDARD.encode(ciphertext), iv: STANDARD.encode(nonce) }
    }

    /// Decode the `iv` field.
    ///
    /// # Errors
    ///
    /// - `Base64` if `iv` is not valid base64
    pub fn nonce(&self) -> Result<Vec<u8>> {
        decode_field("iv", &self.iv)
    }

    /// Decode the `data` field.
    ///
    /// # Errors
    ///
    /// - `Base64` if `data` is not valid base64
    pub fn ciphertext(&self) -> Result<Vec<u8>> {
        decode_field("data", &self.data)
    }
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|err| ProtocolError::Base64 { field, reason: err.to_string() })
}
