//! Line rendering of notifications.
//!
//! One notification becomes at most one line. Messages are prefixed with
//! their index so `/reply`, `/edit` and `/react` can address them.

use std::io::{self, Write};

use burner_app::Notification;
use burner_client::{MessageItem, TeardownReason};
use burner_core::{Author, Content};

/// Writes notifications as text lines.
pub struct Renderer<W> {
    out: W,
    peer_name: Option<String>,
}

impl<W: Write> Renderer<W> {
    /// Renderer writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out, peer_name: None }
    }

    /// Render one notification.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn render(&mut self, notification: &Notification) -> io::Result<()> {
        match notification {
            Notification::Established => writeln!(self.out, "* secure channel established"),
            Notification::PeerIdentified { name } => {
                self.peer_name = Some(name.clone());
                writeln!(self.out, "* {name} is here")
            },
            Notification::HandshakeFailed { reason } => {
                writeln!(self.out, "! key exchange failed: {reason}")
            },
            Notification::Message(item) => {
                let line = self.message_line(item);
                writeln!(self.out, "{line}")
            },
            Notification::Edited { index, text } => {
                writeln!(self.out, "[{index}] edited: {text}")
            },
            Notification::Reaction { index, emoji: Some(emoji) } => {
                writeln!(self.out, "[{index}] reaction: {emoji}")
            },
            Notification::Reaction { index, emoji: None } => {
                writeln!(self.out, "[{index}] reaction cleared")
            },
            Notification::PeerTyping(true) => {
                let peer = peer_label(self.peer_name.as_deref());
                writeln!(self.out, "* {peer} is typing...")
            },
            Notification::PeerTyping(false) => Ok(()),
            Notification::PeerLeft { countdown } => {
                let peer = peer_label(self.peer_name.as_deref());
                writeln!(self.out, "* {peer} has left. Closing in {countdown}s...")
            },
            Notification::Countdown { remaining: 0 } => Ok(()),
            Notification::Countdown { remaining } => writeln!(self.out, "* {remaining}..."),
            Notification::RoomFull => writeln!(self.out, "! room is full"),
            Notification::CommandRejected(err) => writeln!(self.out, "! {err}"),
            Notification::Ended(reason) => {
                writeln!(self.out, "* session ended: {}", describe(*reason))
            },
        }?;
        self.out.flush()
    }

    fn message_line(&self, item: &MessageItem) -> String {
        let author = match item.author {
            Author::Local => "you",
            Author::Peer => peer_label(self.peer_name.as_deref()),
        };

        let body = match &item.content {
            Content::Text(text) => text.clone(),
            Content::Image { mime, bytes } => format!("[image {mime}, {} bytes]", bytes.len()),
        };

        match item.reply_to {
            Some(target) => format!("[{}] {author} (re {target}): {body}", item.index),
            None => format!("[{}] {author}: {body}", item.index),
        }
    }
}

fn peer_label(name: Option<&str>) -> &str {
    name.unwrap_or("peer")
}

fn describe(reason: TeardownReason) -> &'static str {
    match reason {
        TeardownReason::Exit => "you left the room",
        TeardownReason::PeerDeparted => "peer left the room",
        TeardownReason::RoomFull => "room is full",
        TeardownReason::TransportClosed => "connection lost",
    }
}
