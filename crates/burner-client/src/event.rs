//! Session events and actions.

use burner_core::MessageItem;
use burner_proto::Frame;

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Receiving text frames from the transport
/// - Driving time forward via ticks
/// - Forwarding user intents (send, edit, react, exit)
///
/// Generic over `I` (Instant type) so tests can drive a virtual clock.
#[derive(Debug, Clone)]
pub enum SessionEvent<I> {
    /// Transport connected; announce our key and name.
    Connected,

    /// Raw text frame received from the relay.
    FrameReceived(String),

    /// Time tick for typing debounce and departure countdown.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// User wants to send a text message.
    SendText {
        /// Message text.
        text: String,
        /// Index of the message being replied to.
        reply_to: Option<u64>,
    },

    /// User wants to send an image.
    SendImage {
        /// Declared MIME type.
        mime: String,
        /// Raw image bytes.
        bytes: Vec<u8>,
    },

    /// User wants to replace the text of one of their own messages.
    EditMessage {
        /// Target index.
        index: u64,
        /// Replacement text.
        text: String,
    },

    /// User sets or clears a reaction.
    React {
        /// Target index.
        index: u64,
        /// Emoji, or `None` to clear.
        emoji: Option<String>,
    },

    /// User typed into the composer.
    Keystroke,

    /// User left the room.
    Exit,

    /// Transport closed underneath us.
    TransportClosed,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// Local user exited
    Exit,
    /// Departure countdown expired
    PeerDeparted,
    /// Relay rejected the join
    RoomFull,
    /// Transport closed or failed
    TransportClosed,
}

/// Actions the session produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send a frame to the relay.
    Send(Frame),

    /// Close the transport.
    CloseTransport,

    /// Shared secret derived; content can flow.
    Established,

    /// Peer announced their display name.
    PeerIdentified {
        /// Peer display name.
        name: String,
    },

    /// Peer key was rejected; the handshake is still pending.
    HandshakeFailed {
        /// Why the key was rejected.
        reason: String,
    },

    /// A message was appended to the log.
    MessageAppended(MessageItem),

    /// A message's text was replaced.
    MessageEdited {
        /// Edited index.
        index: u64,
        /// New text.
        text: String,
    },

    /// A reaction overlay changed.
    ReactionChanged {
        /// Target index.
        index: u64,
        /// New reaction, `None` when cleared.
        emoji: Option<String>,
    },

    /// Remote typing indicator changed.
    PeerTyping(bool),

    /// Peer disconnected; teardown follows after the countdown.
    PeerLeft {
        /// Countdown start value.
        countdown: u8,
    },

    /// One countdown step elapsed.
    CountdownTick {
        /// Steps left before teardown.
        remaining: u8,
    },

    /// Relay rejected the join because the room has two participants.
    RoomFull,

    /// Session is over; every secret and message has been dropped.
    TornDown {
        /// Why the session ended.
        reason: TeardownReason,
    },
}
