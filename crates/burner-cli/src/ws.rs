//! WebSocket driver.

use burner_app::Driver;
use burner_client::transport::Connection;
use thiserror::Error;

/// WebSocket driver errors.
#[derive(Debug, Error)]
pub enum WsError {
    /// The connection task is gone or was stopped.
    #[error("relay connection closed")]
    Closed,
}

/// [`Driver`] over a relay [`Connection`].
pub struct WsDriver {
    connection: Connection,
    closed: bool,
}

impl WsDriver {
    /// Wrap an open connection.
    pub fn new(connection: Connection) -> Self {
        Self { connection, closed: false }
    }
}

impl Driver for WsDriver {
    type Error = WsError;

    async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        if self.closed {
            return Err(WsError::Closed);
        }
        self.connection.send(text).await.map_err(|_| WsError::Closed)
    }

    async fn recv_text(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }
        self.connection.recv().await
    }

    async fn close(&mut self) -> Result<(), WsError> {
        if !self.closed {
            self.closed = true;
            // Flushes frames already queued before the Close frame goes out
            self.connection.close().await;
            tracing::debug!("relay connection closed");
        }
        Ok(())
    }
}
