//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::sync::Arc;

use tutors_config::{Config, ModerationConfig};
use tutors_conversation::{ChatOrchestrator, CompletionBinder, RequestBuilder, TopicModerator};
use tutors_core::LLMProvider;
use tutors_providers::GeminiProvider;

mod chat;
mod init;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use init::InitStrategy;
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Binds Gemini clients to the credential the session holds.
pub struct GeminiBinder {
    pub model: String,
    pub temperature: f32,
    pub base_url: Option<String>,
}

impl CompletionBinder for GeminiBinder {
    fn bind(&self, credential: &str) -> anyhow::Result<Arc<dyn LLMProvider>> {
        let mut provider = GeminiProvider::new(credential.to_string())?
            .with_model(self.model.clone())
            .with_temperature(self.temperature);

        if let Some(base_url) = &self.base_url {
            provider = provider.with_base_url(base_url.clone());
        }

        Ok(Arc::new(provider))
    }
}

/// Build the topic gate from config: `None` when disabled, defaults where
/// the config leaves keywords or refusal unset.
fn build_moderator(config: &ModerationConfig) -> Option<TopicModerator> {
    if !config.enabled {
        return None;
    }

    let mut gate = TopicModerator::default();
    if !config.keywords.is_empty() {
        gate = gate.with_keywords(config.keywords.clone());
    }
    if let Some(refusal) = &config.refusal {
        gate = gate.with_refusal(refusal.clone());
    }

    Some(gate)
}

/// Assemble the orchestrator and binder from loaded configuration.
fn build_components(
    config: &Config,
    model_override: Option<String>,
    history_limit_override: Option<usize>,
) -> anyhow::Result<(ChatOrchestrator, GeminiBinder)> {
    let retry = config.retry.to_policy()?;

    let request = RequestBuilder::new(config.chat.system_prompt.clone())
        .with_history_limit(history_limit_override.or(config.chat.history_limit));

    let orchestrator = ChatOrchestrator::new(request, build_moderator(&config.moderation), retry);

    let binder = GeminiBinder {
        model: model_override.unwrap_or_else(|| config.chat.model.clone()),
        temperature: config.chat.temperature,
        base_url: config.provider.base_url.clone(),
    };

    Ok((orchestrator, binder))
}
