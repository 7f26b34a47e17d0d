//! Burner Wire Protocol
//!
//! JSON text frames exchanged through the relay, plus the plaintext formats
//! sealed inside encrypted frames.
//!
//! ```text
//! transport text ──► decode() ──► Inbound::RoomFull        (bare sentinel)
//!                                 Inbound::Frame(Frame)    (known `type`)
//!                                 Inbound::Unknown{kind}   (ignored)
//! ```
//!
//! The codec performs no cryptography. Binary fields stay base64 text until
//! the session opens them with the shared key.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod encoding;
pub mod errors;
pub mod frame;
pub mod payload;

pub use encoding::EncodedEnvelope;
pub use errors::{ProtocolError, Result};
pub use frame::{Frame, Inbound, MAX_FRAME_SIZE, ROOM_FULL, decode};
pub use payload::{MessageBody, StructuredPayload, decode_text};
