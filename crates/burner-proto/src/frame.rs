//! Frames exchanged between two peers through the relay.
//!
//! Every frame is a UTF-8 JSON object carrying a `type` discriminator, except
//! the relay's capacity sentinel [`ROOM_FULL`], which is bare text and is
//! recognized before any JSON parsing.
//!
//! # Forward Compatibility
//!
//! Unknown `type` values decode to [`Inbound::Unknown`] rather than an error,
//! so newer peers can add frame kinds without breaking older ones. Unknown
//! fields inside known frames are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    encoding::EncodedEnvelope,
    errors::{ProtocolError, Result},
};

/// Sentinel text sent by the relay when a third participant tries to join.
pub const ROOM_FULL: &str = "ROOM_FULL";

/// Maximum accepted frame size (16 MiB).
///
/// Large enough for a base64 image payload, small enough to bound memory
/// spent on a single frame.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Frame kinds this implementation understands.
const KNOWN_TYPES: [&str; 9] =
    ["key", "name", "msg", "img", "edit", "reaction", "typing", "stopped_typing", "peer_left"];

/// A decoded JSON frame.
///
/// Field names match the wire schema exactly; binary fields are base64 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Handshake public key announcement
    Key {
        /// Public key in JWK form
        data: Value,
    },
    /// Display name announcement
    Name {
        /// Display name
        data: String,
    },
    /// Encrypted text payload
    Msg {
        /// Base64 ciphertext
        data: String,
        /// Base64 nonce
        iv: String,
    },
    /// Encrypted image bytes
    Img {
        /// Base64 ciphertext
        data: String,
        /// Base64 nonce
        iv: String,
        /// Declared MIME type of the plaintext image
        mime: String,
    },
    /// Replacement text for a previously sent message
    Edit {
        /// Log index of the edited message
        index: u64,
        /// Base64 ciphertext of the new text
        data: String,
        /// Base64 nonce
        iv: String,
    },
    /// Set (`Some`) or clear (`None`) the reaction at an index
    Reaction {
        /// Log index of the reacted message
        index: u64,
        /// Emoji, or `null` to clear
        #[serde(default)]
        emoji: Option<String>,
    },
    /// Remote is composing
    Typing,
    /// Remote stopped composing
    StoppedTyping,
    /// Synthesized by the relay when the other participant disconnects
    PeerLeft,
}

impl Frame {
    /// Build a `msg` frame from an encoded envelope.
    pub fn msg(envelope: EncodedEnvelope) -> Self {
        Self::Msg { data: envelope.data, iv: envelope.iv }
    }

    /// Build an `img` frame from an encoded envelope.
    pub fn img(envelope: EncodedEnvelope, mime: impl Into<String>) -> Self {
        Self::Img { data: envelope.data, iv: envelope.iv, mime: mime.into() }
    }

    /// Build an `edit` frame from an encoded envelope.
    pub fn edit(index: u64, envelope: EncodedEnvelope) -> Self {
        Self::Edit { index, data: envelope.data, iv: envelope.iv }
    }

    /// Wire discriminator of this frame.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Key { .. } => "key",
            Self::Name { .. } => "name",
            Self::Msg { .. } => "msg",
            Self::Img { .. } => "img",
            Self::Edit { .. } => "edit",
            Self::Reaction { .. } => "reaction",
            Self::Typing => "typing",
            Self::StoppedTyping => "stopped_typing",
            Self::PeerLeft => "peer_left",
        }
    }

    /// Encrypted fields of a `msg`, `img` or `edit` frame.
    pub fn envelope(&self) -> Option<EncodedEnvelope> {
        match self {
            Self::Msg { data, iv } | Self::Img { data, iv, .. } | Self::Edit { data, iv, .. } => {
                Some(EncodedEnvelope { data: data.clone(), iv: iv.clone() })
            },
            _ => None,
        }
    }

    /// Serialize to JSON text.
    ///
    /// # Errors
    ///
    /// - `FrameTooLarge` if the encoded text exceeds [`MAX_FRAME_SIZE`]
    /// - `Json` if serialization fails
    pub fn encode(&self) -> Result<String> {
        let text = serde_json::to_string(self)?;

        if text.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: text.len(), max: MAX_FRAME_SIZE });
        }

        Ok(text)
    }
}

/// Result of decoding one text frame from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The relay rejected us: the room already has two participants
    RoomFull,
    /// A known frame kind
    Frame(Frame),
    /// A well-formed frame of a kind we do not understand
    Unknown {
        /// The unrecognized `type` value
        kind: String,
    },
}

/// Decode one text frame.
///
/// The sentinel is matched on exact text before JSON parsing. A JSON object
/// whose `type` is not a known kind yields [`Inbound::Unknown`].
///
/// # Errors
///
/// - `FrameTooLarge` if `text` exceeds [`MAX_FRAME_SIZE`]
/// - `Json` if `text` is not JSON or a known kind has missing/mistyped fields
/// - `MissingType` if the object carries no string `type`
pub fn decode(text: &str) -> Result<Inbound> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: text.len(), max: MAX_FRAME_SIZE });
    }

    if text == ROOM_FULL {
        return Ok(Inbound::RoomFull);
    }

    let value: Value = serde_json::from_str(text)?;

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(ProtocolError::MissingType);
    };

    if !KNOWN_TYPES.contains(&kind) {
        return Ok(Inbound::Unknown { kind: kind.to_owned() });
    }

    let frame = serde_json::from_value(value)?;
    Ok(Inbound::Frame(frame))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode_frame(text: &str) -> Frame {
        match decode(text).unwrap() {
            Inbound::Frame(frame) => frame,
            other => unreachable!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn room_full_sentinel() {
        assert_eq!(decode("ROOM_FULL").unwrap(), Inbound::RoomFull);
    }

    #[test]
    fn sentinel_match_is_exact() {
        assert!(decode("ROOM_FULL ").is_err());
        assert!(decode("room_full").is_err());
        assert_eq!(
            decode(r#"{"type":"ROOM_FULL"}"#).unwrap(),
            Inbound::Unknown { kind: "ROOM_FULL".to_owned() }
        );
    }

    #[test]
    fn unit_frames_are_bare_type_objects() {
        assert_eq!(Frame::Typing.encode().unwrap(), r#"{"type":"typing"}"#);
        assert_eq!(Frame::StoppedTyping.encode().unwrap(), r#"{"type":"stopped_typing"}"#);
        assert_eq!(Frame::PeerLeft.encode().unwrap(), r#"{"type":"peer_left"}"#);
    }

    #[test]
    fn msg_wire_shape() {
        let frame = Frame::msg(EncodedEnvelope { data: "Y3Q=".to_owned(), iv: "bm9uY2U=".to_owned() });

        let value: Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();

        assert_eq!(value, json!({"type": "msg", "data": "Y3Q=", "iv": "bm9uY2U="}));
    }

    #[test]
    fn img_and_edit_wire_shape() {
        let envelope = EncodedEnvelope { data: "AA==".to_owned(), iv: "AQ==".to_owned() };

        let img: Value =
            serde_json::from_str(&Frame::img(envelope.clone(), "image/png").encode().unwrap()).unwrap();
        let edit: Value = serde_json::from_str(&Frame::edit(3, envelope).encode().unwrap()).unwrap();

        assert_eq!(img, json!({"type": "img", "data": "AA==", "iv": "AQ==", "mime": "image/png"}));
        assert_eq!(edit, json!({"type": "edit", "index": 3, "data": "AA==", "iv": "AQ=="}));
    }

    #[test]
    fn reaction_null_clears() {
        let frame = decode_frame(r#"{"type":"reaction","index":2,"emoji":null}"#);
        assert_eq!(frame, Frame::Reaction { index: 2, emoji: None });

        let frame = decode_frame(r#"{"type":"reaction","index":2,"emoji":"🔥"}"#);
        assert_eq!(frame, Frame::Reaction { index: 2, emoji: Some("🔥".to_owned()) });
    }

    #[test]
    fn reaction_clear_encodes_null() {
        let value: Value =
            serde_json::from_str(&Frame::Reaction { index: 0, emoji: None }.encode().unwrap())
                .unwrap();

        assert_eq!(value, json!({"type": "reaction", "index": 0, "emoji": null}));
    }

    #[test]
    fn key_carries_arbitrary_json() {
        let jwk = json!({"kty": "EC", "crv": "P-256", "x": "abc", "y": "def", "ext": true});
        let text = json!({"type": "key", "data": jwk}).to_string();

        assert_eq!(decode_frame(&text), Frame::Key { data: jwk });
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        assert_eq!(
            decode(r#"{"type":"read_receipt","index":4}"#).unwrap(),
            Inbound::Unknown { kind: "read_receipt".to_owned() }
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        assert_eq!(decode_frame(r#"{"type":"typing","from":"relay"}"#), Frame::Typing);
    }

    #[test]
    fn missing_type_rejected() {
        assert_eq!(decode(r#"{"data":"x"}"#), Err(ProtocolError::MissingType));
        assert_eq!(decode(r#"{"type":7}"#), Err(ProtocolError::MissingType));
        assert_eq!(decode("[1,2]"), Err(ProtocolError::MissingType));
    }

    #[test]
    fn known_type_with_bad_fields_rejected() {
        assert!(matches!(decode(r#"{"type":"msg","data":"x"}"#), Err(ProtocolError::Json { .. })));
        assert!(matches!(
            decode(r#"{"type":"edit","index":-1,"data":"","iv":""}"#),
            Err(ProtocolError::Json { .. })
        ));
    }

    #[test]
    fn not_json_rejected() {
        assert!(matches!(decode("hello"), Err(ProtocolError::Json { .. })));
    }

    #[test]
    fn oversized_frame_rejected() {
        let text = "x".repeat(MAX_FRAME_SIZE + 1);

        assert_eq!(
            decode(&text),
            Err(ProtocolError::FrameTooLarge { size: MAX_FRAME_SIZE + 1, max: MAX_FRAME_SIZE })
        );
    }

    #[test]
    fn envelope_accessor() {
        let envelope = EncodedEnvelope { data: "AA==".to_owned(), iv: "AQ==".to_owned() };

        assert_eq!(Frame::msg(envelope.clone()).envelope(), Some(envelope.clone()));
        assert_eq!(Frame::edit(1, envelope.clone()).envelope(), Some(envelope));
        assert_eq!(Frame::Typing.envelope(), None);
    }

    #[test]
    fn kind_matches_serialized_type() {
        let frames = [
            Frame::Key { data: json!({}) },
            Frame::Name { data: "ada".to_owned() },
            Frame::Reaction { index: 0, emoji: None },
            Frame::Typing,
            Frame::StoppedTyping,
            Frame::PeerLeft,
        ];

        for frame in frames {
            let value: Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
            assert_eq!(value["type"], frame.kind());
        }
    }
}
