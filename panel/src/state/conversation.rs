//! Conversation log for the chat surface.
//!
//! DESIGN
//! ======
//! The log is an ordered, capacity-bounded list with FIFO eviction. A reply in flight
//! is represented by a single `Pending` placeholder that is later resolved in
//! place or discarded, so display order never shifts when the server answers.
//!
//! History hydration happens once per authenticated session. The latch lives on
//! the session (`AuthSession::history`) rather than here, so signing out and in
//! again re-enables it without touching the store.

#[cfg(test)]
#[path = "conversation_test.rs"]
mod conversation_test;

use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::state::auth::HistoryLatch;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Whether a message carries content or stands in for a reply in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Content,
    Pending,
}

/// A single entry in the conversation log.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub kind: MessageKind,
    /// Literal for users, markdown for the assistant. Empty while pending.
    pub text: String,
    /// Display locator of the image sent with this message, never the bytes.
    pub attachment: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: f64,
}

impl Message {
    #[must_use]
    pub fn user(text: impl Into<String>, attachment: Option<String>, timestamp: f64) -> Self {
        Self::new(Role::User, MessageKind::Content, text.into(), attachment, timestamp)
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>, timestamp: f64) -> Self {
        Self::new(Role::Assistant, MessageKind::Content, text.into(), None, timestamp)
    }

    #[must_use]
    pub fn pending(timestamp: f64) -> Self {
        Self::new(Role::Assistant, MessageKind::Pending, String::new(), None, timestamp)
    }

    fn new(role: Role, kind: MessageKind, text: String, attachment: Option<String>, timestamp: f64) -> Self {
        Self { id: uuid::Uuid::new_v4().to_string(), role, kind, text, attachment, timestamp }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.kind == MessageKind::Pending
    }
}

/// Contract violations the controller is expected to prevent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("a pending reply is already outstanding")]
    PendingExists,
}

/// Ordered, bounded message log.
#[derive(Clone, Debug)]
pub struct ConversationStore {
    messages: Vec<Message>,
    capacity: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ConversationStore {
    /// Create an empty log holding at most `capacity` messages (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { messages: Vec::new(), capacity: capacity.max(1) }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(Message::is_pending)
    }

    /// Append at the tail, evicting from the head beyond capacity.
    ///
    /// A pending message replaces any existing placeholder rather than
    /// creating a second one.
    pub fn append(&mut self, message: Message) {
        if message.is_pending() {
            self.messages.retain(|m| !m.is_pending());
        }
        self.messages.push(message);
        self.evict_overflow();
    }

    /// Append the placeholder for a reply in flight.
    ///
    /// # Errors
    ///
    /// [`StoreError::PendingExists`] if a placeholder is already present.
    pub fn append_pending(&mut self, timestamp: f64) -> Result<(), StoreError> {
        if self.has_pending() {
            return Err(StoreError::PendingExists);
        }
        self.append(Message::pending(timestamp));
        Ok(())
    }

    /// Replace the placeholder in place with assistant content.
    ///
    /// Returns `false` (and changes nothing) when there is no placeholder,
    /// e.g. because the log was cleared while the request was in flight.
    pub fn resolve_pending(&mut self, text: impl Into<String>) -> bool {
        let Some(slot) = self.messages.iter_mut().find(|m| m.is_pending()) else {
            return false;
        };
        slot.kind = MessageKind::Content;
        slot.role = Role::Assistant;
        slot.text = text.into();
        true
    }

    /// Remove the placeholder after a failed exchange.
    pub fn discard_pending(&mut self) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| !m.is_pending());
        self.messages.len() != before
    }

    /// Replace the log with server history, once per session.
    ///
    /// Returns `true` if the history was applied, `false` if the latch was
    /// already set. Only the newest `capacity` entries are kept.
    pub fn hydrate(&mut self, latch: &mut HistoryLatch, history: Vec<Message>) -> bool {
        if latch.is_set() {
            return false;
        }
        self.clear();
        let skip = history.len().saturating_sub(self.capacity);
        self.messages.extend(history.into_iter().skip(skip).filter(|m| !m.is_pending()));
        latch.set();
        true
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn evict_overflow(&mut self) {
        if self.messages.len() > self.capacity {
            let excess = self.messages.len() - self.capacity;
            self.messages.drain(..excess);
        }
    }
}
