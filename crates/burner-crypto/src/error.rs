//! Error types for handshake and envelope operations.

use thiserror::Error;

/// Errors from key exchange and authenticated encryption.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// No valid P-256 scalar could be produced from the supplied randomness.
    #[error("key generation failed after {attempts} attempts")]
    KeyGeneration {
        /// Number of candidate scalars rejected
        attempts: u32,
    },

    /// Peer public key is malformed, on the wrong curve, or not on the curve.
    #[error("invalid public key: {reason}")]
    InvalidPublicKey {
        /// Why the key was rejected
        reason: String,
    },

    /// Nonce does not have the AES-GCM length.
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonce {
        /// Required length
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Authentication tag did not verify (tampering, corruption or wrong key).
    #[error("decryption failed")]
    DecryptionFailed,
}

impl CryptoError {
    /// Returns true if the session cannot continue after this error.
    ///
    /// Only setup failures are fatal. Key and per-item failures leave the
    /// session usable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::KeyGeneration { .. })
    }
}
