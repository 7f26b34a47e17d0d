//! Fuzz target for relay frame decoding
//!
//! Feeds arbitrary text to `decode` to find:
//! - Parser panics on malformed JSON or wrong field types
//! - Frames that decode but cannot be re-encoded
//!
//! # Invariants
//!
//! - NEVER panic, invalid input returns an error
//! - A decoded known frame re-encodes and decodes to a frame of the same
//!   type, and to an identical frame unless it carries arbitrary JSON (`key`)

#![no_main]

use burner_proto::{decode, Frame, Inbound, MAX_FRAME_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(Inbound::Frame(frame)) = decode(text) {
        let encoded = frame.encode().expect("decoded frame must re-encode");
        if encoded.len() > MAX_FRAME_SIZE {
            return;
        }
        match decode(&encoded) {
            Ok(Inbound::Frame(again)) if matches!(frame, Frame::Key { .. }) => {
                assert_eq!(again.kind(), frame.kind());
            }
            Ok(Inbound::Frame(again)) => assert_eq!(again, frame),
            other => panic!("re-encoded frame decoded as {other:?}"),
        }
    }
});
