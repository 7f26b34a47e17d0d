//! Burner terminal client.
//!
//! Line-oriented frontend over [`burner_app::Runtime`]: stdin lines become
//! commands, notifications become stdout lines, diagnostics go to stderr.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod input;
pub mod render;
pub mod ws;
