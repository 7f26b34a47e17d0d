//! Session errors.
//!
//! Only local intents and setup return errors. Failures while handling an
//! inbound frame are logged and the frame is dropped, so they never appear
//! here.

use burner_core::LogError;
use burner_crypto::CryptoError;
use burner_proto::ProtocolError;
use thiserror::Error;

/// Errors returned by [`Session`](crate::Session).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Ephemeral keypair could not be generated; the join is aborted
    #[error("key generation failed: {reason}")]
    KeyGeneration {
        /// Underlying failure
        reason: String,
    },

    /// No shared secret yet
    #[error("handshake not complete")]
    NotEstablished,

    /// Text is empty or whitespace only
    #[error("message is empty")]
    EmptyMessage,

    /// Index does not address an existing message
    #[error("no message at index {index} (log has {len} items)")]
    InvalidIndex {
        /// Requested index
        index: u64,
        /// Current log length
        len: u64,
    },

    /// Target message may not be edited locally
    #[error("message {index} cannot be edited: {reason}")]
    NotEditable {
        /// Target index
        index: u64,
        /// Why the edit was refused
        reason: LogError,
    },

    /// Cryptographic failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Encoding failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    /// Returns true if the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::KeyGeneration { .. } => true,
            Self::Crypto(err) => err.is_fatal(),
            _ => false,
        }
    }
}
