//! Burner Core
//!
//! Session-independent building blocks: the index-addressed message log,
//! presence timers, and the environment abstraction that supplies time and
//! randomness.
//!
//! # Components
//!
//! - [`env`]: time and randomness behind a trait for deterministic tests
//! - [`message_log`]: ordered items with reply, edit and reaction overlays
//! - [`presence`]: typing debounce and departure countdown deadlines
//! - [`error`]: log mutation errors

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod message_log;
pub mod presence;

pub use env::{Environment, SystemEnv};
pub use error::LogError;
pub use message_log::{Author, Content, EditOrigin, Entry, MessageItem, MessageLog, SystemNotice};
pub use presence::{DepartureCountdown, TypingState};
