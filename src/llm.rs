//! Chat-completion providers.
//!
//! The answer generator talks to a model only through [`LlmProvider`], so
//! tests and offline deployments can substitute a fake or the
//! [`DisabledProvider`].
//!
//! | Provider | `llm.provider` | Notes |
//! |----------|----------------|-------|
//! | [`OpenAiProvider`] | `"openai"` | Any OpenAI-compatible `/chat/completions` endpoint |
//! | [`DisabledProvider`] | `"disabled"` | Every call fails; answers fall back to the apology text |

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

/// One chat completion: a fixed system prompt plus the user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key found in ${0}")]
    MissingCredential(String),
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
    #[error("LLM provider rate limited the request")]
    RateLimited,
    #[error("LLM provider rejected the credentials")]
    Unauthorized,
    #[error("network error talking to LLM provider: {0}")]
    Network(String),
    #[error("LLM provider returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed LLM response: {0}")]
    MalformedResponse(String),
    #[error("LLM is disabled in configuration")]
    Disabled,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Return the assistant message text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Build the provider named by `config.provider`.
///
/// The API key is read from the environment once, here. A missing key is
/// not an error at construction; each call then fails with
/// [`LlmError::MissingCredential`].
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    if config.is_enabled() {
        Arc::new(OpenAiProvider::new(config))
    } else {
        Arc::new(DisabledProvider)
    }
}

pub struct DisabledProvider;

#[async_trait]
impl LlmProvider for DisabledProvider {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<String, LlmError> {
        Err(LlmError::Disabled)
    }
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key_env: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "LLM API key not set; answers will use the fallback text"
            );
        }
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &LlmConfig, api_key: Option<String>) -> Self {
        // The answer generator enforces the overall deadline; this only
        // guards against a connection that never completes.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.saturating_add(5)))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingCredential(self.api_key_env.clone()))?;

        let body = serde_json::json!({
            "model": self.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::Unauthorized,
                429 => LlmError::RateLimited,
                code => LlmError::Api {
                    status: code,
                    body: body_text,
                },
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        parse_chat_response(&json)
    }
}

/// Extract `choices[0].message.content` from a chat completion body.
fn parse_chat_response(json: &serde_json::Value) -> Result<String, LlmError> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            LlmError::MalformedResponse("missing choices[0].message.content".to_string())
        })?;

    let content = content.trim();
    if content.is_empty() {
        return Err(LlmError::MalformedResponse("empty completion".to_string()));
    }
    Ok(content.to_string())
}
