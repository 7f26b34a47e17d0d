//! Fuzz target for decrypted message bodies
//!
//! Plaintext comes from the peer, so it is attacker-controlled once the
//! handshake is done.
//!
//! # Invariants
//!
//! - NEVER panic
//! - Valid UTF-8 always decodes (structured or legacy)
//! - Invalid UTF-8 is rejected by both body and edit decoding

#![no_main]

use burner_proto::{decode_text, MessageBody};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let body = MessageBody::decode(data);
    let text = decode_text(data);

    if std::str::from_utf8(data).is_ok() {
        let body = body.expect("valid UTF-8 always yields a body");
        let _ = body.as_text();
        assert!(text.is_ok());
    } else {
        assert!(body.is_err());
        assert!(text.is_err());
    }
});
