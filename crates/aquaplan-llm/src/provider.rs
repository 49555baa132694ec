//! Model providers
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use aquaplan_core::{OrchestratorError, OrchestratorResult};

use crate::config::ProviderConfig;
use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

/// A single model endpoint. One call, one attempt; retries are the
/// invoker's business.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Return the raw assistant text for `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> OrchestratorResult<String>;
}

/// Client for any API speaking the OpenAI `/chat/completions` dialect
/// (Gemini's compatibility endpoint, NVIDIA NIM, OpenRouter, Ollama).
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: ProviderConfig,
    api_key: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: ProviderConfig, api_key: String) -> Self {
        Self {
            client: Client::new(),
            config,
            api_key,
        }
    }

    /// Build from config, reading the key from `api_key_env`.
    pub fn from_config(config: ProviderConfig) -> OrchestratorResult<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            OrchestratorError::Config(format!(
                "provider '{}' has no API key in ${}",
                config.name, config.api_key_env
            ))
        })?;
        Ok(Self::new(config, api_key))
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn invocation_error(&self, message: impl Into<String>) -> OrchestratorError {
        OrchestratorError::ProviderInvocation {
            provider: self.config.name.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, messages: &[ChatMessage]) -> OrchestratorResult<String> {
        debug!(
            provider = %self.config.name,
            model = %self.config.model,
            messages = messages.len(),
            "Creating chat completion"
        );

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.invocation_error(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            error!(provider = %self.config.name, status = status.as_u16(), "Provider API error: {}", message);
            return Err(self.invocation_error(format!("HTTP {}: {}", status.as_u16(), message)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| self.invocation_error(format!("malformed completion body: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| self.invocation_error("no completion returned"))
    }
}
