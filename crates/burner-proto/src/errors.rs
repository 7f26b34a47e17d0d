//! Wire protocol errors.

use thiserror::Error;

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that occur while encoding or decoding frames.
///
/// Every variant is contained at the frame-handling boundary: a frame that
/// fails to decode is dropped and the session continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Text is not valid JSON, or does not match the schema for its `type`
    #[error("malformed frame: {reason}")]
    Json {
        /// Parser message
        reason: String,
    },

    /// A base64 field could not be decoded
    #[error("invalid base64 in field '{field}': {reason}")]
    Base64 {
        /// Name of the offending field
        field: &'static str,
        /// Decoder message
        reason: String,
    },

    /// JSON object without a string `type` discriminator
    #[error("frame has no 'type' field")]
    MissingType,

    /// Frame text exceeds the size limit
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Size of the rejected frame
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// Decrypted text payload is not UTF-8
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json { reason: err.to_string() }
    }
}
