//! Builds the outbound request from conversation state.
//!
//! The provider expects a flat list of role/content pairs: one system
//! entry, the prior history in order, and the new utterance as the final
//! user entry. The caller passes history *excluding* the new utterance;
//! the builder appends it exactly once.

use tutors_core::ChatMessage;

/// Maps a system prompt plus history plus new utterance into the message
/// sequence the provider expects.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    system_prompt: String,
    history_limit: Option<usize>,
}

impl RequestBuilder {
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            history_limit: None,
        }
    }

    /// Keep only the last `limit` history messages in outbound requests.
    #[must_use]
    pub const fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the outbound message sequence.
    ///
    /// Output shape: `[system, history..., user(new_utterance)]` with roles
    /// preserved positionally. Pure; empty history is legal.
    #[must_use]
    pub fn build(&self, history: &[ChatMessage], new_utterance: &str) -> Vec<ChatMessage> {
        let start = self
            .history_limit
            .map_or(0, |limit| history.len().saturating_sub(limit));

        let mut messages = Vec::with_capacity(history.len() - start + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend_from_slice(&history[start..]);
        messages.push(ChatMessage::user(new_utterance));

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutors_core::Role;

    fn history(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("question {i}"))
                } else {
                    ChatMessage::assistant(format!("answer {i}"))
                }
            })
            .collect()
    }

    #[test]
    fn output_is_system_then_history_then_user() {
        let builder = RequestBuilder::new("You are a tutor.");
        let hist = history(4);

        let messages = builder.build(&hist, "What is a p-value?");

        assert_eq!(messages.len(), 1 + 4 + 1);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "You are a tutor.");
        for (built, original) in messages[1..5].iter().zip(&hist) {
            assert_eq!(built, original);
        }
        assert_eq!(messages[5].role, Role::User);
        assert_eq!(messages[5].content, "What is a p-value?");
    }

    #[test]
    fn empty_history_and_prompt_are_legal() {
        let builder = RequestBuilder::new("");
        let messages = builder.build(&[], "hello");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn history_limit_keeps_most_recent() {
        let builder = RequestBuilder::new("sys").with_history_limit(Some(3));
        let hist = history(10);

        let messages = builder.build(&hist, "new");

        assert_eq!(messages.len(), 1 + 3 + 1);
        assert_eq!(messages[1], hist[7]);
        assert_eq!(messages[3], hist[9]);
    }
}
