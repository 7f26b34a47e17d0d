//! User commands.
//!
//! A frontend turns user input into [`Command`]s and pushes them into the
//! runtime. Line-oriented frontends use [`Input::parse`], which understands a
//! small slash-command syntax:
//!
//! | input | command |
//! |---|---|
//! | `text` | send `text` |
//! | `//text` | send `/text` |
//! | `/reply N text` | send `text` as a reply to message `N` |
//! | `/edit N text` | replace the text of own message `N` |
//! | `/react N emoji` | set the reaction on message `N` |
//! | `/unreact N` | clear the reaction on message `N` |
//! | `/img path` | attach the image at `path` |
//! | `/quit`, `/exit` | leave the room |
//! | `/help` | show usage |

use std::path::{Path, PathBuf};

use burner_client::SessionEvent;
use thiserror::Error;

/// User intent forwarded to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a text message, optionally replying to an earlier one.
    Send {
        /// Message text
        text: String,
        /// Quoted index
        reply_to: Option<u64>,
    },

    /// Send an image.
    SendImage {
        /// Declared MIME type
        mime: String,
        /// Raw image bytes
        bytes: Vec<u8>,
    },

    /// Replace the text of one of our messages.
    Edit {
        /// Target index
        index: u64,
        /// Replacement text
        text: String,
    },

    /// Set (`Some`) or clear (`None`) a reaction.
    React {
        /// Target index
        index: u64,
        /// Emoji
        emoji: Option<String>,
    },

    /// Composer input changed.
    Keystroke,

    /// Leave the room.
    Quit,
}

impl Command {
    /// Session event for this command.
    pub fn into_event<I>(self) -> SessionEvent<I> {
        match self {
            Self::Send { text, reply_to } => SessionEvent::SendText { text, reply_to },
            Self::SendImage { mime, bytes } => SessionEvent::SendImage { mime, bytes },
            Self::Edit { index, text } => SessionEvent::EditMessage { index, text },
            Self::React { index, emoji } => SessionEvent::React { index, emoji },
            Self::Keystroke => SessionEvent::Keystroke,
            Self::Quit => SessionEvent::Exit,
        }
    }
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Ready to forward.
    Command(Command),

    /// The frontend must read the file and send [`Command::SendImage`].
    AttachImage(PathBuf),

    /// Show usage.
    Help,
}

/// Command parse errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line
    #[error("empty input")]
    Empty,

    /// Unrecognized slash command
    #[error("unknown command: /{name}")]
    Unknown {
        /// Command name without the slash
        name: String,
    },

    /// Required argument absent
    #[error("/{command} requires {argument}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// What is missing
        argument: &'static str,
    },

    /// Index argument is not a non-negative integer
    #[error("invalid message index: {value:?}")]
    InvalidIndex {
        /// Raw argument
        value: String,
    },
}

impl Input {
    /// Parse one line of user input.
    ///
    /// Trailing line terminators are stripped. Plain text is sent verbatim;
    /// emptiness beyond that is checked by the session.
    ///
    /// # Errors
    ///
    /// - `Empty` if the line is blank
    /// - `Unknown` for an unrecognized slash command
    /// - `MissingArgument` / `InvalidIndex` for malformed arguments
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(CommandError::Empty);
        }

        if let Some(escaped) = line.strip_prefix("//") {
            return Ok(Self::Command(Command::Send { text: format!("/{escaped}"), reply_to: None }));
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Command(Command::Send { text: line.to_string(), reply_to: None }));
        };

        let (name, args) = split_word(rest);
        match name {
            "reply" => {
                let (index, text) = indexed_text("reply", args)?;
                Ok(Self::Command(Command::Send { text, reply_to: Some(index) }))
            },
            "edit" => {
                let (index, text) = indexed_text("edit", args)?;
                Ok(Self::Command(Command::Edit { index, text }))
            },
            "react" => {
                let (index, emoji) = indexed_text("react", args)?;
                Ok(Self::Command(Command::React { index, emoji: Some(emoji) }))
            },
            "unreact" => {
                let (index_arg, _) = split_word(args);
                let index = parse_index("unreact", index_arg)?;
                Ok(Self::Command(Command::React { index, emoji: None }))
            },
            "img" => {
                let path = args.trim();
                if path.is_empty() {
                    return Err(CommandError::MissingArgument { command: "img", argument: "a path" });
                }
                Ok(Self::AttachImage(PathBuf::from(path)))
            },
            "quit" | "exit" => Ok(Self::Command(Command::Quit)),
            "help" => Ok(Self::Help),
            other => Err(CommandError::Unknown { name: other.to_string() }),
        }
    }
}

/// MIME type for an image path, from its extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Usage text for line-oriented frontends.
pub const USAGE: &str = "\
commands:
  <text>              send a message (start with // to send a leading slash)
  /reply N <text>     reply to message N
  /edit N <text>      edit your message N
  /react N <emoji>    react to message N
  /unreact N          clear your reaction on message N
  /img <path>         send an image
  /quit               leave the room";

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest),
        None => (input, ""),
    }
}

fn parse_index(command: &'static str, raw: &str) -> Result<u64, CommandError> {
    if raw.is_empty() {
        return Err(CommandError::MissingArgument { command, argument: "a message index" });
    }
    raw.parse().map_err(|_| CommandError::InvalidIndex { value: raw.to_string() })
}

fn indexed_text(command: &'static str, args: &str) -> Result<(u64, String), CommandError> {
    let (index_arg, rest) = split_word(args);
    let index = parse_index(command, index_arg)?;
    let text = rest.trim();
    if text.is_empty() {
        return Err(CommandError::MissingArgument { command, argument: "text" });
    }
    Ok((index, text.to_string()))
}
