//! Driver trait for abstracting relay I/O.
//!
//! The [`Driver`] trait decouples the [`crate::Runtime`] from a specific
//! transport. The CLI implements it over a WebSocket; tests implement it over
//! in-memory channels.

use std::future::Future;

/// Abstracts the text-frame transport for one room.
///
/// # Implementations
///
/// - **CLI**: WebSocket connection to the relay
/// - **Tests**: paired in-memory channels with a scripted relay
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Send one text frame to the relay.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the write fails.
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive the next text frame from the relay.
    ///
    /// Returns `None` once the connection is closed.
    fn recv_text(&mut self) -> impl Future<Output = Option<String>> + Send;

    /// Close the connection. Calling this twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails.
    fn close(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
