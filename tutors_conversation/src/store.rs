//! The ordered conversation log.

use chrono::{DateTime, Utc};
use tutors_core::{ChatMessage, Role};

/// Ordered, append-only-by-default sequence of messages for one session.
///
/// Ordering reflects chronological turn order. The store is mutated only by
/// the orchestrator (append) and by an explicit user-initiated clear.
#[derive(Debug, Clone)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MessageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message to the end of the log.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Remove all messages. Idempotent.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.updated_at = Utc::now();
    }

    /// The current ordered transcript. Read-only view.
    #[must_use]
    pub fn snapshot(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of user messages in the log.
    #[must_use]
    pub fn user_messages(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }

    /// Number of assistant messages in the log.
    #[must_use]
    pub fn assistant_messages(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
