//! Application layer for Burner chat
//!
//! Generic async runtime that drives a Sans-IO [`burner_client::Session`],
//! so every frontend shares the same orchestration and tests can run it over
//! in-memory transports.
//!
//! # Components
//!
//! - [`Driver`]: Trait for relay I/O
//! - [`Runtime`]: Single-task loop over frames, commands and ticks
//! - [`Command`]: User intents, with a slash-command parser ([`Input`])
//! - [`Notification`]: What the frontend should render

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod driver;
mod notification;
mod runtime;

pub use command::{Command, CommandError, Input, USAGE, mime_for_path};
pub use driver::Driver;
pub use notification::Notification;
pub use runtime::{DEFAULT_TICK_INTERVAL, Runtime, RuntimeConfig, RuntimeError, RuntimeHandle};
