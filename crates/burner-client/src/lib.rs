//! Client
//!
//! Action-based session state machine for Burner chat. Drives the key
//! exchange, seals and opens payloads, and keeps the message log and presence
//! state for one two-party room.
//!
//! # Architecture
//!
//! The session is Sans-IO. It receives events ([`SessionEvent`]), processes
//! them through pure state machine logic, and returns actions
//! ([`SessionAction`]) for the caller to execute. Time and randomness come
//! from an [`Environment`], so the same code runs under a virtual clock in
//! tests.
//!
//! # Components
//!
//! - [`Session`]: Aggregate root for one room membership
//! - [`Handshake`]: Key exchange state machine
//! - [`SessionEvent`]: Events fed into the session
//! - [`SessionAction`]: Actions produced by the session
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::Connection`]: Channels bridged to a WebSocket
//! - [`transport::connect`]: Connect to a relay room

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod error;
mod event;
mod handshake;
mod session;

#[cfg(feature = "transport")]
pub mod transport;

pub use burner_core::{Environment, MessageItem};
pub use config::{
    DEFAULT_DEPARTURE_COUNTDOWN, DEFAULT_DEPARTURE_TICK, DEFAULT_TYPING_DEBOUNCE, SessionConfig,
};
pub use error::SessionError;
pub use event::{SessionAction, SessionEvent, TeardownReason};
pub use handshake::{Handshake, HandshakeState, PeerKeyOutcome};
pub use session::Session;
