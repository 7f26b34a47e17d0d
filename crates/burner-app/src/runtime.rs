//! Generic runtime for session orchestration.
//!
//! The Runtime drives one [`Session`] from a single task, coordinating
//! between:
//! - [`Driver`]: relay I/O
//! - [`Command`]s from the frontend
//! - Periodic ticks from the [`Environment`] clock
//!
//! Session actions are executed in order. `Send` and `CloseTransport` go to
//! the driver; everything else is forwarded as a [`Notification`].

use std::time::Duration;

use burner_client::{
    Environment, Session, SessionAction, SessionError, SessionEvent, TeardownReason,
};
use burner_proto::Frame;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{Command, Driver, Notification};

/// Default interval between session ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Depth of the command channel.
const COMMAND_CAPACITY: usize = 32;

/// Runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// How often the session is ticked when nothing else happens.
    ///
    /// Bounds the latency of `stopped_typing` and countdown steps.
    pub tick_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { tick_interval: DEFAULT_TICK_INTERVAL }
    }
}

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError<E: std::error::Error + 'static> {
    /// The session cannot continue.
    #[error("session failed: {0}")]
    Session(#[source] SessionError),

    /// The driver failed to close the connection.
    #[error("driver error: {0}")]
    Driver(#[source] E),
}

/// Frontend side of a runtime.
pub struct RuntimeHandle {
    /// Push user commands. Dropping every sender exits the room.
    pub commands: mpsc::Sender<Command>,
    /// Notifications in the order the session produced them.
    pub notifications: mpsc::UnboundedReceiver<Notification>,
}

/// What woke the loop.
enum Wake {
    Frame(Option<String>),
    Command(Option<Command>),
    Tick,
}

/// Generic runtime that drives a [`Session`] over a [`Driver`].
///
/// # Type Parameters
///
/// - `D`: Relay I/O driver
/// - `E`: Environment for time and randomness
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    env: E,
    session: Session<E>,
    config: RuntimeConfig,
    commands: mpsc::Receiver<Command>,
    notifications: mpsc::UnboundedSender<Notification>,
    ended: Option<TeardownReason>,
    close_error: Option<D::Error>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    /// Create a runtime for a joined session.
    ///
    /// `env` must be the environment the session was joined with, so ticks
    /// and session timers share one clock.
    pub fn new(
        driver: D,
        env: E,
        session: Session<E>,
        config: RuntimeConfig,
    ) -> (Self, RuntimeHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();

        let runtime = Self {
            driver,
            env,
            session,
            config,
            commands: command_rx,
            notifications: notification_tx,
            ended: None,
            close_error: None,
        };
        let handle = RuntimeHandle { commands: command_tx, notifications: notification_rx };
        (runtime, handle)
    }

    /// Run until the session is torn down.
    ///
    /// Announces the key and name, then loops over inbound frames, commands
    /// and ticks. The session is ticked after every wake-up.
    ///
    /// # Errors
    ///
    /// - `Session` if the session hits a fatal error
    /// - `Driver` if closing the connection failed (the session is already
    ///   torn down at that point)
    pub async fn run(mut self) -> Result<TeardownReason, RuntimeError<D::Error>> {
        self.dispatch(SessionEvent::Connected).await?;

        let reason = loop {
            if let Some(reason) = self.ended {
                break reason;
            }

            let wake = tokio::select! {
                biased;

                frame = self.driver.recv_text() => Wake::Frame(frame),
                command = self.commands.recv() => Wake::Command(command),
                () = self.env.sleep(self.config.tick_interval) => Wake::Tick,
            };

            let event = match wake {
                Wake::Frame(Some(text)) => Some(SessionEvent::FrameReceived(text)),
                Wake::Frame(None) => {
                    tracing::info!("relay connection closed");
                    Some(SessionEvent::TransportClosed)
                },
                Wake::Command(Some(command)) => Some(command.into_event()),
                Wake::Command(None) => {
                    tracing::debug!("frontend dropped command channel, exiting");
                    Some(SessionEvent::Exit)
                },
                Wake::Tick => None,
            };

            if let Some(event) = event {
                self.dispatch(event).await?;
            }

            if self.ended.is_none() {
                let now = self.env.now();
                self.dispatch(SessionEvent::Tick { now }).await?;
            }
        };

        tracing::info!(?reason, "session ended");

        match self.close_error.take() {
            Some(err) => Err(RuntimeError::Driver(err)),
            None => Ok(reason),
        }
    }

    /// Feed an event to the session and execute the resulting actions.
    ///
    /// A failed send is turned into `TransportClosed` and fed back in, so
    /// this loops instead of recursing.
    async fn dispatch(
        &mut self,
        event: SessionEvent<E::Instant>,
    ) -> Result<(), RuntimeError<D::Error>> {
        let mut pending = Some(event);

        while let Some(event) = pending.take() {
            let actions = match self.session.handle(event) {
                Ok(actions) => actions,
                Err(err) if err.is_fatal() => {
                    tracing::error!(%err, "session failed");
                    return Err(RuntimeError::Session(err));
                },
                Err(err) => {
                    tracing::info!(%err, "command rejected");
                    self.notify(Notification::CommandRejected(err));
                    continue;
                },
            };

            let mut transport_failed = false;
            for action in actions {
                match action {
                    SessionAction::Send(frame) => {
                        if !transport_failed && !self.send(&frame).await {
                            transport_failed = true;
                        }
                    },
                    SessionAction::CloseTransport => {
                        if let Err(err) = self.driver.close().await {
                            tracing::warn!(%err, "failed to close relay connection");
                            self.close_error = Some(err);
                        }
                    },
                    SessionAction::TornDown { reason } => {
                        self.ended = Some(reason);
                        self.notify(Notification::Ended(reason));
                    },
                    other => {
                        if let Some(notification) = Notification::from_action(other) {
                            self.notify(notification);
                        }
                    },
                }
            }

            if transport_failed && self.ended.is_none() {
                pending = Some(SessionEvent::TransportClosed);
            }
        }

        Ok(())
    }

    /// Encode and send a frame. Returns `false` if the transport is gone.
    async fn send(&mut self, frame: &Frame) -> bool {
        let text = match frame.encode() {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(kind = frame.kind(), %err, "failed to encode frame");
                return true;
            },
        };

        match self.driver.send_text(text).await {
            Ok(()) => {
                tracing::trace!(kind = frame.kind(), "sent frame");
                true
            },
            Err(err) => {
                tracing::warn!(kind = frame.kind(), %err, "send failed, treating transport as closed");
                false
            },
        }
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            tracing::trace!("frontend gone, dropping notification");
        }
    }

    /// The session being driven.
    pub fn session(&self) -> &Session<E> {
        &self.session
    }
}
