//! Stdin line interpretation.
//!
//! Wraps [`Input::parse`] and resolves `/img` by reading the file, so the
//! runtime only ever sees complete [`Command`]s.

use std::{io, path::Path};

use burner_app::{Command, CommandError, Input, mime_for_path};
use thiserror::Error;

/// What to do with one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Forward to the runtime.
    Command(Command),
    /// Print usage.
    Help,
    /// Nothing to do.
    Blank,
}

/// Input errors shown to the user.
#[derive(Debug, Error)]
pub enum InputError {
    /// Malformed command
    #[error(transparent)]
    Parse(#[from] CommandError),

    /// Image file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        /// Path as typed
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Extension is not a known image type
    #[error("not a supported image: {path}")]
    UnsupportedImage {
        /// Path as typed
        path: String,
    },
}

/// Interpret one line of user input.
///
/// # Errors
///
/// - `Parse` for malformed commands
/// - `UnsupportedImage` / `Read` when `/img` cannot be resolved
pub fn interpret(line: &str) -> Result<Line, InputError> {
    match Input::parse(line) {
        Ok(Input::Command(command)) => Ok(Line::Command(command)),
        Ok(Input::Help) => Ok(Line::Help),
        Ok(Input::AttachImage(path)) => load_image(&path).map(Line::Command),
        Err(CommandError::Empty) => Ok(Line::Blank),
        Err(err) => Err(err.into()),
    }
}

fn load_image(path: &Path) -> Result<Command, InputError> {
    let display = path.display().to_string();
    let Some(mime) = mime_for_path(path) else {
        return Err(InputError::UnsupportedImage { path: display });
    };

    let bytes = std::fs::read(path).map_err(|source| InputError::Read { path: display, source })?;
    Ok(Command::SendImage { mime: mime.to_string(), bytes })
}
