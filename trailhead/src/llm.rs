//! LLM Provider Abstraction
//!
//! Abstraction layer over the external text-generation service used for
//! selection reasoning and descriptive prose. Callers treat any `Err` as
//! "service unavailable" and take their documented fallback path; nothing
//! in this module retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Configuration for LLM providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub timeout_seconds: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: Some(500),
            temperature: None,
            timeout_seconds: Some(30),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("failed to create HTTP client: {0}")]
    Client(String),
    #[error("missing API key")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned no completion")]
    EmptyCompletion,
}

/// Abstract interface for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Generate text from a prompt
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError>;
}

/// OpenAI-compatible provider (works with OpenAI and OpenRouter)
pub struct OpenAiLlmProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiLlmProvider {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.unwrap_or(30)))
            .build()
            .map_err(|e| LlmError::Client(e.to_string()))?;
        Ok(Self { config, client })
    }
}

// OpenAI API types
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl LlmProvider for OpenAiLlmProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.config.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1");

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.model, "sending completion request");
        let response: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(content)
    }
}

/// One scripted stub response.
pub enum StubReply {
    Reply(String),
    Failure,
}

/// Deterministic provider for tests and offline runs. Replies are consumed
/// front to back; an exhausted script reports the service as unavailable.
#[derive(Default)]
pub struct StubLlmProvider {
    script: Mutex<VecDeque<StubReply>>,
}

impl StubLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(replies: Vec<StubReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
        }
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(StubReply::Reply(text.into()));
    }

    pub fn push_failure(&self) {
        self.script.lock().unwrap().push_back(StubReply::Failure);
    }
}

#[async_trait]
impl LlmProvider for StubLlmProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate_text(&self, _prompt: &str) -> Result<String, LlmError> {
        match self.script.lock().unwrap().pop_front() {
            Some(StubReply::Reply(text)) => Ok(text),
            Some(StubReply::Failure) | None => Err(LlmError::EmptyCompletion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_provider_consumes_script_in_order() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let provider = StubLlmProvider::with_script(vec![
                StubReply::Reply("first".to_string()),
                StubReply::Failure,
            ]);

            assert_eq!(provider.generate_text("p").await.unwrap(), "first");
            assert!(provider.generate_text("p").await.is_err());
            // exhausted script keeps failing
            assert!(provider.generate_text("p").await.is_err());
        });
    }
}
