//! Per-session state: credential, bound client, message log.
//!
//! Exactly one [`SessionContext`] exists per user session. It is an
//! explicit value passed to the orchestrator, never ambient global state;
//! a host serving several sessions constructs one context each and shares
//! nothing between them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use tutors_core::{ChatMessage, LLMProvider};

use crate::orchestrator::ChatError;
use crate::store::MessageStore;

/// Constructs a completion client bound to a credential.
///
/// The session compares credentials by value and calls this only when the
/// value actually changed. Construction failure (malformed credential) is
/// surfaced as [`ChatError::Configuration`] without touching the session.
pub trait CompletionBinder: Send + Sync {
    fn bind(&self, credential: &str) -> anyhow::Result<Arc<dyn LLMProvider>>;
}

/// Session-scoped container for the active credential, the bound client,
/// the message log and the in-flight guard.
pub struct SessionContext {
    /// Session identifier
    pub id: Uuid,
    credential: Option<String>,
    client: Option<Arc<dyn LLMProvider>>,
    store: MessageStore,
    busy: bool,
    created_at: DateTime<Utc>,
}

impl SessionContext {
    /// Create a fresh, unconfigured session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            credential: None,
            client: None,
            store: MessageStore::new(),
            busy: false,
            created_at: Utc::now(),
        }
    }

    /// Update the credential, rebinding the client on change.
    ///
    /// Same value: no-op, history untouched. Changed value: a new client is
    /// bound through `binder` and the message log is unconditionally
    /// cleared, so stale history is never sent to a newly-bound key. An
    /// empty credential unbinds the client. If binding fails, the previous
    /// credential and client stay in place.
    pub fn set_credential(
        &mut self,
        credential: &str,
        binder: &dyn CompletionBinder,
    ) -> Result<(), ChatError> {
        if self.credential.as_deref() == Some(credential)
            || (credential.is_empty() && self.credential.is_none())
        {
            return Ok(());
        }

        if credential.is_empty() {
            info!(session = %self.id, "Credential removed, unbinding client");
            self.credential = None;
            self.client = None;
            self.store.clear();
            return Ok(());
        }

        let client = binder
            .bind(credential)
            .map_err(|e| ChatError::Configuration(e.to_string()))?;

        info!(session = %self.id, "Credential changed, client rebound and history cleared");
        self.credential = Some(credential.to_string());
        self.client = Some(client);
        self.store.clear();

        Ok(())
    }

    /// Whether a completion client is currently bound.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// The bound client, if any.
    #[must_use]
    pub fn client(&self) -> Option<Arc<dyn LLMProvider>> {
        self.client.clone()
    }

    /// Ordered transcript for rendering.
    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        self.store.snapshot()
    }

    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.store.message_count()
    }

    /// User-initiated clear of the conversation log.
    pub fn clear_history(&mut self) {
        self.store.clear();
    }

    /// Re-entrancy guard: true only while a turn is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) const fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub(crate) const fn store_mut(&mut self) -> &mut MessageStore {
        &mut self.store
    }

    pub(crate) const fn store(&self) -> &MessageStore {
        &self.store
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tutors_core::ProviderError;

    struct NullProvider;

    #[async_trait]
    impl LLMProvider for NullProvider {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
            Ok(String::new())
        }

        fn model(&self) -> &str {
            "null"
        }
    }

    struct OkBinder;

    impl CompletionBinder for OkBinder {
        fn bind(&self, _credential: &str) -> anyhow::Result<Arc<dyn LLMProvider>> {
            Ok(Arc::new(NullProvider))
        }
    }

    struct FailBinder;

    impl CompletionBinder for FailBinder {
        fn bind(&self, credential: &str) -> anyhow::Result<Arc<dyn LLMProvider>> {
            anyhow::bail!("malformed credential: {credential}")
        }
    }

    fn populated_session() -> SessionContext {
        let mut ctx = SessionContext::new();
        ctx.set_credential("A", &OkBinder).unwrap();
        for i in 0..10 {
            ctx.store_mut().append(ChatMessage::user(format!("m{i}")));
        }
        ctx
    }

    #[test]
    fn credential_change_clears_history() {
        let mut ctx = populated_session();
        assert_eq!(ctx.message_count(), 10);

        ctx.set_credential("B", &OkBinder).unwrap();

        assert_eq!(ctx.message_count(), 0);
        assert!(ctx.is_connected());
    }

    #[test]
    fn same_credential_is_a_no_op() {
        let mut ctx = populated_session();

        ctx.set_credential("A", &OkBinder).unwrap();

        assert_eq!(ctx.message_count(), 10);
    }

    #[test]
    fn bind_failure_leaves_previous_client_and_history() {
        let mut ctx = populated_session();

        let err = ctx.set_credential("broken", &FailBinder).unwrap_err();

        assert!(matches!(err, ChatError::Configuration(_)));
        assert!(ctx.is_connected());
        assert_eq!(ctx.message_count(), 10);

        // The good credential is still the active one.
        ctx.set_credential("A", &OkBinder).unwrap();
        assert_eq!(ctx.message_count(), 10);
    }

    #[test]
    fn empty_credential_unbinds_and_clears() {
        let mut ctx = populated_session();

        ctx.set_credential("", &OkBinder).unwrap();

        assert!(!ctx.is_connected());
        assert_eq!(ctx.message_count(), 0);
    }

    #[test]
    fn fresh_session_is_disconnected_and_idle() {
        let ctx = SessionContext::new();
        assert!(!ctx.is_connected());
        assert!(!ctx.is_busy());
        assert_eq!(ctx.message_count(), 0);
    }
}
