//! Notifications for the frontend.
//!
//! The runtime executes I/O actions itself and forwards everything the user
//! should see as a [`Notification`].

use burner_client::{MessageItem, SessionAction, SessionError, TeardownReason};

/// Something the frontend should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Shared secret derived; messages can be sent.
    Established,

    /// Peer announced their display name.
    PeerIdentified {
        /// Peer display name
        name: String,
    },

    /// Peer key was rejected; still waiting for a usable one.
    HandshakeFailed {
        /// Why the key was rejected
        reason: String,
    },

    /// New message in the log (ours or the peer's).
    Message(MessageItem),

    /// Message text replaced.
    Edited {
        /// Edited index
        index: u64,
        /// New text
        text: String,
    },

    /// Reaction set or cleared.
    Reaction {
        /// Target index
        index: u64,
        /// New reaction
        emoji: Option<String>,
    },

    /// Peer started or stopped typing.
    PeerTyping(bool),

    /// Peer disconnected; the room closes after the countdown.
    PeerLeft {
        /// Countdown start value
        countdown: u8,
    },

    /// One countdown step elapsed.
    Countdown {
        /// Steps left
        remaining: u8,
    },

    /// Relay refused the join.
    RoomFull,

    /// A user command was refused; the session continues.
    CommandRejected(SessionError),

    /// Session over; no further notifications follow.
    Ended(TeardownReason),
}

impl Notification {
    /// Frontend-facing counterpart of a session action.
    ///
    /// Returns `None` for I/O actions the runtime executes itself.
    pub fn from_action(action: SessionAction) -> Option<Self> {
        let notification = match action {
            SessionAction::Send(_) | SessionAction::CloseTransport => return None,
            SessionAction::Established => Self::Established,
            SessionAction::PeerIdentified { name } => Self::PeerIdentified { name },
            SessionAction::HandshakeFailed { reason } => Self::HandshakeFailed { reason },
            SessionAction::MessageAppended(item) => Self::Message(item),
            SessionAction::MessageEdited { index, text } => Self::Edited { index, text },
            SessionAction::ReactionChanged { index, emoji } => Self::Reaction { index, emoji },
            SessionAction::PeerTyping(typing) => Self::PeerTyping(typing),
            SessionAction::PeerLeft { countdown } => Self::PeerLeft { countdown },
            SessionAction::CountdownTick { remaining } => Self::Countdown { remaining },
            SessionAction::RoomFull => Self::RoomFull,
            SessionAction::TornDown { reason } => Self::Ended(reason),
        };
        Some(notification)
    }
}
