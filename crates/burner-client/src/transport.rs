//! WebSocket transport for the session.
//!
//! Provides [`Connection`] which bridges one relay WebSocket to a pair of
//! channels carrying text frames. This is a thin layer: frame decoding and
//! protocol logic remain in the Sans-IO [`Session`](crate::Session).

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Channel depth in each direction.
const CHANNEL_CAPACITY: usize = 64;

/// How long [`Connection::close`] waits for queued frames and the Close
/// handshake before aborting the connection task.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// The connection was closed locally or by the relay.
    #[error("connection closed")]
    Closed,
}

/// Handle to a relay room connection.
///
/// Text frames are sent and received through channels; an internal task
/// handles the WebSocket I/O. [`recv`](Self::recv) yields `None` once the
/// socket closes.
pub struct Connection {
    to_relay: Option<mpsc::Sender<String>>,
    from_relay: mpsc::Receiver<String>,
    task: Option<JoinHandle<()>>,
}

impl Connection {
    /// Queue a text frame for the relay.
    ///
    /// # Errors
    ///
    /// - `Closed` after [`close`](Self::close) or once the connection task
    ///   has exited
    pub async fn send(&self, text: String) -> Result<(), TransportError> {
        let Some(to_relay) = &self.to_relay else {
            return Err(TransportError::Closed);
        };
        to_relay.send(text).await.map_err(|_| TransportError::Closed)
    }

    /// Next text frame from the relay, or `None` once the socket is closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_relay.recv().await
    }

    /// Close the connection.
    ///
    /// Frames already queued are written, then a Close frame is sent. The
    /// connection task is aborted if that takes longer than
    /// [`CLOSE_TIMEOUT`]. Idempotent.
    pub async fn close(&mut self) {
        // Dropping the only sender lets the task drain the queue and close
        self.to_relay = None;
        self.from_relay.close();

        let Some(mut task) = self.task.take() else {
            return;
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut task).await.is_err() {
            tracing::warn!(timeout = ?CLOSE_TIMEOUT, "relay close timed out, aborting");
            task.abort();
        }
    }
}

/// WebSocket URL for `room` under `relay_base`.
///
/// # Errors
///
/// - `Connection` if the room name is empty or contains `/` or whitespace
pub fn room_url(relay_base: &str, room: &str) -> Result<String, TransportError> {
    if room.is_empty() || room.contains('/') || room.contains(char::is_whitespace) {
        return Err(TransportError::Connection(format!("invalid room name: {room:?}")));
    }

    Ok(format!("{}/{room}", relay_base.trim_end_matches('/')))
}

/// Connect to a relay room.
///
/// Returns a [`Connection`] with channels for frame transport.
///
/// # Errors
///
/// - `Connection` if the room name is invalid or the handshake fails
pub async fn connect(relay_base: &str, room: &str) -> Result<Connection, TransportError> {
    let url = room_url(relay_base, room)?;

    // Both ring and aws-lc-rs may be compiled in; pin the provider for wss://
    let _ = rustls::crypto::ring::default_provider().install_default();

    let (stream, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| TransportError::Connection(format!("connect to {url} failed: {e}")))?;

    tracing::info!(%url, "connected to relay");

    let (to_relay_tx, to_relay_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (from_relay_tx, from_relay_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    let handle = tokio::spawn(async move {
        if let Err(e) = run_connection(stream, to_relay_rx, from_relay_tx).await {
            tracing::warn!(error = %e, "relay connection ended");
        }
    });

    Ok(Connection { to_relay: Some(to_relay_tx), from_relay: from_relay_rx, task: Some(handle) })
}

/// Run the connection, bridging between channels and the WebSocket.
async fn run_connection<S>(
    stream: S,
    mut to_relay: mpsc::Receiver<String>,
    from_relay: mpsc::Sender<String>,
) -> Result<(), TransportError>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            biased;

            outbound = to_relay.recv() => {
                let Some(text) = outbound else {
                    // Sender dropped and queue drained: close politely
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                };
                write
                    .send(Message::Text(text))
                    .await
                    .map_err(|e| TransportError::Stream(format!("write failed: {e}")))?;
            },
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    // Receiver closed means we are shutting down; keep draining
                    if from_relay.send(text).await.is_err() {
                        tracing::trace!("dropping inbound frame during close");
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("relay closed connection");
                    return Ok(());
                },
                Some(Ok(other)) => {
                    tracing::trace!(?other, "ignoring non-text message");
                },
                Some(Err(e)) => return Err(TransportError::Stream(format!("read failed: {e}"))),
            },
        }
    }
}
