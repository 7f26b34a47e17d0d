//! Fuzz target for envelope authentication
//!
//! # Strategy
//!
//! - Tamper: seal a message, then flip bits in nonce or ciphertext
//! - Truncate: cut the ciphertext short, down to and below the tag size
//! - Garbage: open arbitrary bytes as an envelope
//!
//! # Invariants
//!
//! - NEVER panic
//! - Any modification of a sealed envelope fails to open
//! - An untouched envelope always opens to the original plaintext

#![no_main]

use arbitrary::Arbitrary;
use burner_crypto::{open, seal, Envelope, KeyPair, SharedSecret, NONCE_SIZE};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Attack {
    Tamper { plaintext: Vec<u8>, nonce: [u8; NONCE_SIZE], position: u16, mask: u8, in_nonce: bool },
    Truncate { plaintext: Vec<u8>, nonce: [u8; NONCE_SIZE], keep: u16 },
    Garbage { nonce: Vec<u8>, ciphertext: Vec<u8> },
}

fn secret() -> SharedSecret {
    let mut counter = 0u8;
    let mut fill = |buf: &mut [u8]| {
        for byte in buf {
            counter = counter.wrapping_add(1);
            *byte = counter;
        }
    };
    let ours = KeyPair::generate(&mut fill).expect("deterministic keygen");
    let theirs = KeyPair::generate(&mut fill).expect("deterministic keygen");
    ours.derive(&theirs.export_public())
}

fuzz_target!(|attack: Attack| {
    let secret = secret();

    match attack {
        Attack::Tamper { plaintext, nonce, position, mask, in_nonce } => {
            let sealed = seal(&secret, &plaintext, nonce);
            assert_eq!(open(&secret, &sealed).expect("untouched envelope opens"), plaintext);
            if mask == 0 {
                return;
            }

            let mut tampered_nonce = sealed.nonce;
            let mut ciphertext = sealed.ciphertext.clone();
            if in_nonce {
                tampered_nonce[position as usize % NONCE_SIZE] ^= mask;
            } else {
                let len = ciphertext.len();
                ciphertext[position as usize % len] ^= mask;
            }

            let tampered = Envelope::from_parts(&tampered_nonce, ciphertext).expect("nonce size kept");
            assert!(open(&secret, &tampered).is_err());
        }

        Attack::Truncate { plaintext, nonce, keep } => {
            let sealed = seal(&secret, &plaintext, nonce);
            let keep = keep as usize % sealed.ciphertext.len();
            let truncated = Envelope::from_parts(&sealed.nonce, sealed.ciphertext[..keep].to_vec())
                .expect("nonce size kept");
            assert!(open(&secret, &truncated).is_err());
        }

        Attack::Garbage { nonce, ciphertext } => {
            if let Ok(envelope) = Envelope::from_parts(&nonce, ciphertext) {
                let _ = open(&secret, &envelope);
            }
        }
    }
});
