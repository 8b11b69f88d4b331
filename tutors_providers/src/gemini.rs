//! Google Gemini completion provider.
//!
//! Talks to the Generative Language `generateContent` endpoint. The
//! provider does not retry on its own; the orchestrator wraps calls in the
//! retry executor, so every failure here is classified into the
//! [`ProviderError`] taxonomy the executor understands.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tracing::info;

use tutors_core::{ChatMessage, LLMProvider, ProviderError, Role};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TEMPERATURE: f32 = 0.7;

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiProvider {
    /// Create a provider bound to `api_key`.
    ///
    /// Fails on an empty key; the remote service is the authority on
    /// whether a non-empty key is actually valid.
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("API key must not be empty");
        }

        info!("Creating GeminiProvider");
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build the `generateContent` request body.
    ///
    /// System messages become the `systemInstruction`; assistant turns map
    /// to the wire role `model`.
    fn build_payload(&self, messages: &[ChatMessage]) -> Value {
        let system_text = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                };
                json!({
                    "role": role,
                    "parts": [{ "text": m.content }],
                })
            })
            .collect();

        let mut payload = json!({
            "contents": contents,
            "generationConfig": { "temperature": self.temperature },
        });

        if !system_text.is_empty() {
            payload["systemInstruction"] = json!({ "parts": [{ "text": system_text }] });
        }

        payload
    }

    /// Send a single request. No retries here.
    async fn try_send(&self, payload: &Value) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Other(format!("malformed response body: {e}")))?;

        extract_reply(&body)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let payload = self.build_payload(messages);

        info!("Sending request to Gemini API: model={}", self.model);
        let reply = self.try_send(&payload).await?;
        info!("Received response from Gemini API");

        Ok(reply)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Classify a transport-level reqwest failure.
fn classify_transport(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() {
        ProviderError::Transient(format!("transport failure: {error}"))
    } else {
        ProviderError::Other(format!("request failed: {error}"))
    }
}

/// Classify a non-success HTTP status.
fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let summary = format!("HTTP {status}: {}", body.chars().take(200).collect::<String>());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(summary),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::Transient(summary)
        }
        s if s.is_server_error() => ProviderError::Transient(summary),
        // Gemini reports a malformed key as 400 INVALID_ARGUMENT.
        StatusCode::BAD_REQUEST if body.contains("API key") => ProviderError::Auth(summary),
        _ => ProviderError::Other(summary),
    }
}

/// Pull the reply text out of a `generateContent` response.
fn extract_reply(body: &Value) -> Result<String, ProviderError> {
    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| ProviderError::Other("invalid response format: missing text".to_string()))
}
