//! Burner Cryptographic Primitives
//!
//! Building blocks for the two-party Burner chat session. Pure functions:
//! callers supply random bytes, which keeps the session layer deterministic
//! under test.
//!
//! # Key Lifecycle
//!
//! ```text
//! Ephemeral P-256 keypair (per join)
//!        │  public half announced as JWK
//!        ▼
//! ECDH with peer public key
//!        │
//!        ▼
//! x-coordinate → Shared Secret (32 bytes, once per session)
//!        │
//!        ▼
//! AES-256-GCM with fresh 96-bit nonce → Envelope
//! ```
//!
//! # Security
//!
//! Confidentiality:
//! - The shared secret is never transmitted; both peers derive it
//! - Keypair and shared secret are zeroized when dropped
//! - Nonces are random per envelope; reuse under one key breaks GCM
//!
//! Authenticity:
//! - AES-GCM tag failure -> reject that single payload
//! - Peer identity is "holds the private key of this session", nothing more

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;
pub mod error;
pub mod handshake;

pub use envelope::{Envelope, NONCE_SIZE, open, seal};
pub use error::CryptoError;
pub use handshake::{KeyPair, PortableKey, SHARED_SECRET_SIZE, SharedSecret};
