//! Turn orchestration: one user utterance in, one assistant reply out.
//!
//! The orchestrator is stateless; all mutable state lives in the
//! [`SessionContext`] it is handed. A single turn moves the session
//! through `Idle -> Submitting -> {Succeeded, Failed} -> Idle`, with the
//! busy flag set before the only suspension point (the provider call) and
//! cleared on every exit path.

use thiserror::Error;
use tracing::{debug, info};

use tutors_core::{
    ChatMessage, Clock, LLMProvider, ProviderError, RetryPolicy, TokioClock, execute_with_retry,
};

use crate::moderation::TopicModerator;
use crate::request::RequestBuilder;
use crate::session::SessionContext;

/// Errors surfaced to the caller of [`ChatOrchestrator::handle_turn`].
///
/// All of these are recovered at the orchestrator boundary; none corrupt
/// the session. A failed turn leaves exactly the pre-turn history plus the
/// user's own unanswered message.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no completion client is bound; configure an API credential first")]
    NotConfigured,

    #[error("a turn is already in flight")]
    Busy,

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("utterance must not be empty")]
    EmptyUtterance,

    #[error("provider returned an empty reply")]
    EmptyReply,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Outcome of one successful turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// The reply shown to the user (refusal text if the gate tripped).
    pub reply: String,
    /// Whether the topic gate replaced the provider's reply.
    pub moderated: bool,
    /// 1-based turn counter for this session.
    pub turn_number: usize,
    /// The full transcript after this turn.
    pub transcript: Vec<ChatMessage>,
}

/// Drives a single conversation turn against a [`SessionContext`].
///
/// Holds only read-only policy: the request shape, the optional topic
/// gate, and the retry policy for the provider call.
pub struct ChatOrchestrator<C = TokioClock>
where
    C: Clock,
{
    request: RequestBuilder,
    moderator: Option<TopicModerator>,
    retry: RetryPolicy,
    clock: C,
}

impl ChatOrchestrator<TokioClock> {
    /// Create an orchestrator with the production clock.
    #[must_use]
    pub fn new(request: RequestBuilder, moderator: Option<TopicModerator>, retry: RetryPolicy) -> Self {
        Self {
            request,
            moderator,
            retry,
            clock: TokioClock,
        }
    }
}

impl<C> ChatOrchestrator<C>
where
    C: Clock,
{
    /// Create an orchestrator with an injected clock (tests).
    #[must_use]
    pub const fn with_clock(
        request: RequestBuilder,
        moderator: Option<TopicModerator>,
        retry: RetryPolicy,
        clock: C,
    ) -> Self {
        Self {
            request,
            moderator,
            retry,
            clock,
        }
    }

    /// Process one turn: append the utterance, call the provider under the
    /// retry policy, moderate the reply, append it, and return the updated
    /// transcript.
    ///
    /// Rejections (`NotConfigured`, `Busy`, `EmptyUtterance`) leave the
    /// store untouched. Provider failures leave the user's message in the
    /// log; conversations are never silently rolled back.
    pub async fn handle_turn(
        &self,
        ctx: &mut SessionContext,
        utterance: &str,
    ) -> Result<TurnResult, ChatError> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(ChatError::EmptyUtterance);
        }

        let Some(client) = ctx.client() else {
            return Err(ChatError::NotConfigured);
        };

        if ctx.is_busy() {
            return Err(ChatError::Busy);
        }
        ctx.set_busy(true);

        let result = self.run_turn(ctx, client.as_ref(), utterance).await;

        ctx.set_busy(false);
        result
    }

    async fn run_turn(
        &self,
        ctx: &mut SessionContext,
        client: &dyn LLMProvider,
        utterance: &str,
    ) -> Result<TurnResult, ChatError> {
        let turn_number = ctx.store().assistant_messages() + 1;
        info!(session = %ctx.id, turn = turn_number, "Processing turn");

        ctx.store_mut().append(ChatMessage::user(utterance));

        // The builder appends the utterance itself as the trailing user
        // entry, so it gets the history without the copy just appended.
        let messages = {
            let snapshot = ctx.store().snapshot();
            let history = &snapshot[..snapshot.len() - 1];
            self.request.build(history, utterance)
        };

        let raw = execute_with_retry(&self.retry, &self.clock, || client.complete(&messages))
            .await?;

        if raw.trim().is_empty() {
            return Err(ChatError::EmptyReply);
        }

        let (reply, moderated) = match &self.moderator {
            Some(gate) if !gate.is_on_topic(&raw) => {
                info!(session = %ctx.id, "Reply failed the topic gate");
                (gate.refusal().to_string(), true)
            }
            _ => (raw, false),
        };

        ctx.store_mut().append(ChatMessage::assistant(reply.clone()));
        debug!(session = %ctx.id, turn = turn_number, "Turn completed");

        Ok(TurnResult {
            reply,
            moderated,
            turn_number,
            transcript: ctx.store().snapshot().to_vec(),
        })
    }
}
