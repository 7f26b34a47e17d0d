//! Error types for the message log.

use thiserror::Error;

use crate::message_log::EditOrigin;

/// Errors from mutating the message log.
///
/// None of these are fatal: the offending edit or reaction is dropped and the
/// log is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// Index beyond the end of the log
    #[error("index {index} out of range (log has {len} items)")]
    IndexOutOfRange {
        /// Requested index
        index: u64,
        /// Current number of items
        len: u64,
    },

    /// Edit path does not match the item's author
    #[error("{origin:?} edit not permitted on item {index}")]
    NotAuthor {
        /// Target index
        index: u64,
        /// Which side requested the edit
        origin: EditOrigin,
    },

    /// Edit targets an image item
    #[error("item {index} is not a text message")]
    NotText {
        /// Target index
        index: u64,
    },
}
