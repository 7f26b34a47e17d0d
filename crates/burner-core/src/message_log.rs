//! Ordered, index-addressed conversation log.
//!
//! Replies, edits and reactions address messages by log index, so both peers
//! must assign identical indices to the same content frames. Indices are
//! sequential from 0, assigned on append and never reused.
//!
//! # Invariants
//!
//! - `items[i].index == i` for every item
//! - System notices live outside the indexed sequence and never shift an
//!   index, so a locally synthesized notice cannot desynchronize the peers
//! - Items are never removed while the session lives; [`MessageLog::clear`]
//!   is only called at teardown

use crate::error::LogError;

/// Who wrote an item, from the local point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Author {
    /// The local user
    Local,
    /// The remote peer
    Peer,
}

/// Which path requested an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditOrigin {
    /// An inbound `edit` frame; may only touch peer-authored items
    Remote,
    /// The local user; may only touch locally authored items
    Local,
}

impl EditOrigin {
    fn permits(self, author: Author) -> bool {
        matches!((self, author), (Self::Remote, Author::Peer) | (Self::Local, Author::Local))
    }
}

/// Message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// UTF-8 text
    Text(String),
    /// Raw image bytes with declared MIME type
    Image {
        /// Declared MIME type
        mime: String,
        /// Decrypted image bytes
        bytes: Vec<u8>,
    },
}

/// One indexed conversation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageItem {
    /// Position in the log
    pub index: u64,
    /// Who wrote it
    pub author: Author,
    /// Text or image
    pub content: Content,
    /// Unix milliseconds when appended locally
    pub timestamp_ms: u64,
    /// Quoted index, if this is a reply
    pub reply_to: Option<u64>,
    /// Set once the text has been replaced
    pub edited: bool,
    /// Reaction overlay
    pub reaction: Option<String>,
}

impl MessageItem {
    /// Text of a text item.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Image { .. } => None,
        }
    }
}

/// A local-only system message such as a departure notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemNotice {
    /// Number of items that preceded the notice (display position only)
    pub anchor: u64,
    /// Notice text
    pub text: String,
    /// Unix milliseconds when recorded
    pub timestamp_ms: u64,
}

/// Display entry produced by [`MessageLog::entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    /// An indexed message
    Item(&'a MessageItem),
    /// A system notice
    Notice(&'a SystemNotice),
}

/// Append-only message log with edit and reaction overlays.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    items: Vec<MessageItem>,
    notices: Vec<SystemNotice>,
}

impl MessageLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item and return its index.
    pub fn append(
        &mut self,
        author: Author,
        content: Content,
        reply_to: Option<u64>,
        timestamp_ms: u64,
    ) -> u64 {
        let index = self.len();
        self.items.push(MessageItem {
            index,
            author,
            content,
            timestamp_ms,
            reply_to,
            edited: false,
            reaction: None,
        });

        debug_assert_eq!(self.items.last().map(|item| item.index), Some(self.len() - 1));
        index
    }

    /// Replace the text at `index` and mark it edited.
    ///
    /// # Errors
    ///
    /// - `IndexOutOfRange` if no item exists at `index`
    /// - `NotAuthor` if `origin` may not edit that item's author
    /// - `NotText` if the item is an image
    pub fn edit_at(
        &mut self,
        index: u64,
        text: impl Into<String>,
        origin: EditOrigin,
    ) -> Result<(), LogError> {
        self.check_edit(index, origin)?;

        let Some(item) = self.get_mut(index) else {
            unreachable!("check_edit verified index {index} exists");
        };
        if let Content::Text(existing) = &mut item.content {
            *existing = text.into();
            item.edited = true;
        }
        Ok(())
    }

    /// Whether [`Self::edit_at`] would accept an edit, without applying it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::edit_at`].
    pub fn check_edit(&self, index: u64, origin: EditOrigin) -> Result<(), LogError> {
        let item = self.get(index).ok_or(LogError::IndexOutOfRange { index, len: self.len() })?;

        if !origin.permits(item.author) {
            return Err(LogError::NotAuthor { index, origin });
        }
        if item.text().is_none() {
            return Err(LogError::NotText { index });
        }
        Ok(())
    }

    /// Set (`Some`) or clear (`None`) the reaction at `index`.
    ///
    /// Reactions overwrite regardless of who authored the item.
    ///
    /// # Errors
    ///
    /// - `IndexOutOfRange` if no item exists at `index`
    pub fn set_reaction(&mut self, index: u64, emoji: Option<String>) -> Result<(), LogError> {
        let len = self.len();
        let item = self.get_mut(index).ok_or(LogError::IndexOutOfRange { index, len })?;

        item.reaction = emoji;
        Ok(())
    }

    /// The item quoted by the item at `index`.
    ///
    /// `None` when `index` is out of range, the item is not a reply, or the
    /// quoted index is dangling.
    pub fn resolve_reply(&self, index: u64) -> Option<&MessageItem> {
        let quoted = self.get(index)?.reply_to?;
        self.get(quoted)
    }

    /// Item at `index`.
    pub fn get(&self, index: u64) -> Option<&MessageItem> {
        usize::try_from(index).ok().and_then(|i| self.items.get(i))
    }

    fn get_mut(&mut self, index: u64) -> Option<&mut MessageItem> {
        usize::try_from(index).ok().and_then(|i| self.items.get_mut(i))
    }

    /// Whether `index` addresses an existing item.
    pub fn contains(&self, index: u64) -> bool {
        index < self.len()
    }

    /// Number of indexed items (notices excluded).
    pub fn len(&self) -> u64 {
        self.items.len() as u64
    }

    /// True if no items have been appended.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Indexed items in order.
    pub fn items(&self) -> &[MessageItem] {
        &self.items
    }

    /// Record a system notice after the current last item.
    pub fn push_notice(&mut self, text: impl Into<String>, timestamp_ms: u64) {
        self.notices.push(SystemNotice { anchor: self.len(), text: text.into(), timestamp_ms });
    }

    /// System notices in order.
    pub fn notices(&self) -> &[SystemNotice] {
        &self.notices
    }

    /// Items and notices interleaved in display order.
    ///
    /// A notice appears after every item that existed when it was recorded.
    pub fn entries(&self) -> Vec<Entry<'_>> {
        let mut entries = Vec::with_capacity(self.items.len() + self.notices.len());
        let mut notices = self.notices.iter().peekable();

        for item in &self.items {
            while let Some(notice) = notices.next_if(|notice| notice.anchor <= item.index) {
                entries.push(Entry::Notice(notice));
            }
            entries.push(Entry::Item(item));
        }
        entries.extend(notices.map(Entry::Notice));

        entries
    }

    /// Drop every item and notice.
    pub fn clear(&mut self) {
        self.items.clear();
        self.notices.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn text(s: &str) -> Content {
        Content::Text(s.to_owned())
    }

    #[test]
    fn append_assigns_sequential_indices() {
        let mut log = MessageLog::new();

        assert_eq!(log.append(Author::Peer, text("a"), None, 1), 0);
        assert_eq!(log.append(Author::Local, text("b"), None, 2), 1);
        assert_eq!(log.append(Author::Peer, text("c"), Some(0), 3), 2);

        assert_eq!(log.len(), 3);
        assert!(log.items().iter().enumerate().all(|(i, item)| item.index == i as u64));
    }

    #[test]
    fn remote_edit_of_peer_item() {
        let mut log = MessageLog::new();
        log.append(Author::Peer, text("hello"), None, 0);

        log.edit_at(0, "HELLO", EditOrigin::Remote).unwrap();

        let item = log.get(0).unwrap();
        assert_eq!(item.text(), Some("HELLO"));
        assert!(item.edited);
    }

    #[test]
    fn remote_edit_of_local_item_rejected() {
        let mut log = MessageLog::new();
        log.append(Author::Local, text("mine"), None, 0);

        let result = log.edit_at(0, "hijacked", EditOrigin::Remote);

        assert_eq!(result, Err(LogError::NotAuthor { index: 0, origin: EditOrigin::Remote }));
        let item = log.get(0).unwrap();
        assert_eq!(item.text(), Some("mine"));
        assert!(!item.edited);
    }

    #[test]
    fn local_edit_of_peer_item_rejected() {
        let mut log = MessageLog::new();
        log.append(Author::Peer, text("theirs"), None, 0);

        assert_eq!(
            log.edit_at(0, "x", EditOrigin::Local),
            Err(LogError::NotAuthor { index: 0, origin: EditOrigin::Local })
        );
    }

    #[test]
    fn edit_of_image_rejected() {
        let mut log = MessageLog::new();
        log.append(Author::Peer, Content::Image { mime: "image/png".to_owned(), bytes: vec![1] }, None, 0);

        assert_eq!(log.edit_at(0, "x", EditOrigin::Remote), Err(LogError::NotText { index: 0 }));
    }

    #[test]
    fn edit_out_of_range_rejected() {
        let mut log = MessageLog::new();

        assert_eq!(
            log.edit_at(5, "x", EditOrigin::Remote),
            Err(LogError::IndexOutOfRange { index: 5, len: 0 })
        );
    }

    #[test]
    fn reactions_overwrite_and_clear() {
        let mut log = MessageLog::new();
        log.append(Author::Local, text("a"), None, 0);

        log.set_reaction(0, Some("👍".to_owned())).unwrap();
        log.set_reaction(0, Some("🔥".to_owned())).unwrap();
        assert_eq!(log.get(0).unwrap().reaction.as_deref(), Some("🔥"));

        log.set_reaction(0, None).unwrap();
        assert_eq!(log.get(0).unwrap().reaction, None);

        assert!(log.set_reaction(1, None).is_err());
    }

    #[test]
    fn resolve_reply_follows_reference() {
        let mut log = MessageLog::new();
        log.append(Author::Peer, text("hello"), None, 0);
        log.append(Author::Peer, text("hi"), Some(0), 1);

        assert_eq!(log.resolve_reply(1).and_then(MessageItem::text), Some("hello"));
        assert_eq!(log.resolve_reply(0), None);
    }

    #[test]
    fn resolve_reply_dangling_is_none() {
        let mut log = MessageLog::new();
        log.append(Author::Peer, text("orphan"), Some(42), 0);

        assert_eq!(log.resolve_reply(0), None);
        assert_eq!(log.resolve_reply(7), None);
        assert_eq!(log.resolve_reply(u64::MAX), None);
    }

    #[test]
    fn notices_do_not_consume_indices() {
        let mut log = MessageLog::new();
        log.append(Author::Peer, text("a"), None, 0);
        log.push_notice("Peer has left.", 1);

        let next = log.append(Author::Local, text("b"), None, 2);

        assert_eq!(next, 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.notices()[0].anchor, 1);
    }

    #[test]
    fn entries_interleave_in_display_order() {
        let mut log = MessageLog::new();
        log.push_notice("start", 0);
        log.append(Author::Peer, text("a"), None, 1);
        log.push_notice("middle", 2);
        log.append(Author::Local, text("b"), None, 3);
        log.push_notice("end", 4);

        let shape: Vec<String> = log
            .entries()
            .into_iter()
            .map(|entry| match entry {
                Entry::Item(item) => format!("#{}", item.index),
                Entry::Notice(notice) => notice.text.clone(),
            })
            .collect();

        assert_eq!(shape, ["start", "#0", "middle", "#1", "end"]);
    }

    #[test]
    fn clear_empties_everything() {
        let mut log = MessageLog::new();
        log.append(Author::Peer, text("a"), None, 0);
        log.push_notice("n", 0);

        log.clear();

        assert!(log.is_empty());
        assert!(log.notices().is_empty());
        assert!(log.entries().is_empty());
    }
}
