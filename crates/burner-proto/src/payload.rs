//! Plaintext carried inside encrypted envelopes.
//!
//! `msg` frames seal a structured JSON body `{"kind":"text","text":..,
//! "replyTo":..}`. Older peers sealed the bare message text instead, so
//! decoding falls back to [`MessageBody::Legacy`] when the plaintext is not a
//! structured body. `edit` frames seal the bare replacement text and `img`
//! frames seal raw image bytes.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Structured `msg` plaintext, tagged on `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StructuredPayload {
    /// Text message, optionally replying to an earlier log index
    Text {
        /// Message text
        text: String,
        /// Index of the quoted message, `null` when not a reply
        #[serde(rename = "replyTo", default)]
        reply_to: Option<u64>,
    },
}

/// Decoded `msg` plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Current structured form
    Structured(StructuredPayload),
    /// Bare text from a peer that predates structured payloads
    Legacy(String),
}

impl MessageBody {
    /// Structured text body.
    pub fn text(text: impl Into<String>, reply_to: Option<u64>) -> Self {
        Self::Structured(StructuredPayload::Text { text: text.into(), reply_to })
    }

    /// Message text regardless of form.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Structured(StructuredPayload::Text { text, .. }) | Self::Legacy(text) => text,
        }
    }

    /// Quoted index; legacy bodies never reply.
    pub fn reply_to(&self) -> Option<u64> {
        match self {
            Self::Structured(StructuredPayload::Text { reply_to, .. }) => *reply_to,
            Self::Legacy(_) => None,
        }
    }

    /// Plaintext bytes to seal.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Self::Structured(payload) => Ok(serde_json::to_vec(payload)?),
            Self::Legacy(text) => Ok(text.as_bytes().to_vec()),
        }
    }

    /// Decode opened plaintext.
    ///
    /// Valid UTF-8 that is not a structured body becomes [`Self::Legacy`].
    ///
    /// # Errors
    ///
    /// - `InvalidUtf8` if the plaintext is not UTF-8
    pub fn decode(plaintext: &[u8]) -> Result<Self> {
        let text = decode_text(plaintext)?;

        match serde_json::from_str::<StructuredPayload>(&text) {
            Ok(payload) => Ok(Self::Structured(payload)),
            Err(_) => Ok(Self::Legacy(text)),
        }
    }
}

/// Decode opened plaintext as UTF-8 text (used for `edit` bodies).
///
/// # Errors
///
/// - `InvalidUtf8` if the plaintext is not UTF-8
pub fn decode_text(plaintext: &[u8]) -> Result<String> {
    String::from_utf8(plaintext.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
}
