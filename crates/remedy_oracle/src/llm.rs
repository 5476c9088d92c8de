//! LLM adapter for the oracles.
//!
//! Supports OpenAI and Anthropic APIs, selected via environment variables.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OracleError, OracleResult};

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

/// LLM adapter that handles API calls
pub struct LlmAdapter {
    provider: LlmProvider,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl LlmAdapter {
    /// Create a new LLM adapter with explicit configuration
    pub fn new(provider: LlmProvider, api_key: String, model: Option<String>) -> Self {
        let default_model = match provider {
            LlmProvider::OpenAI => "gpt-4o-mini".to_string(),
            LlmProvider::Anthropic => "claude-sonnet-4-5".to_string(),
        };

        Self {
            provider,
            api_key,
            model: model.unwrap_or(default_model),
            client: reqwest::Client::new(),
        }
    }

    /// Create an LLM adapter from environment variables.
    ///
    /// Checks in order:
    /// 1. OPENAI_API_KEY
    /// 2. ANTHROPIC_API_KEY
    ///
    /// `REMEDY_LLM_MODEL` overrides the default model for either provider.
    pub fn from_env() -> OracleResult<Self> {
        let custom_model = std::env::var("REMEDY_LLM_MODEL").ok();

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.is_empty() {
                return Ok(Self::new(LlmProvider::OpenAI, api_key, custom_model));
            }
        }

        if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
            if !api_key.is_empty() {
                return Ok(Self::new(LlmProvider::Anthropic, api_key, custom_model));
            }
        }

        Err(OracleError::NotConfigured)
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One system + user exchange, returning the raw completion text.
    pub async fn complete(&self, system: &str, user: &str) -> OracleResult<String> {
        match self.provider {
            LlmProvider::OpenAI => self.complete_openai(system, user).await,
            LlmProvider::Anthropic => self.complete_anthropic(system, user).await,
        }
    }

    // OpenAI chat completion
    async fn complete_openai(&self, system: &str, user: &str) -> OracleResult<String> {
        let url = "https://api.openai.com/v1/chat/completions";

        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_completion_tokens: Some(8192),
        };

        // Retry logic for transient errors (5xx, rate limits, network issues)
        const MAX_RETRIES: u32 = 3;
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_secs(1 << attempt);
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(OracleError::Api(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(OracleError::Api(format!(
                    "OpenAI API error {} (attempt {}/{}): {}",
                    status,
                    attempt + 1,
                    MAX_RETRIES,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(OracleError::Api(format!(
                    "OpenAI API error {}: {}",
                    status, body
                )));
            }

            let result: OpenAIResponse = response
                .json()
                .await
                .map_err(|e| OracleError::Api(format!("Failed to parse response: {}", e)))?;

            let content = result
                .choices
                .first()
                .map(|c| c.message.content.clone())
                .ok_or_else(|| OracleError::Api("No response from OpenAI".to_string()))?;

            debug!(model = %self.model, chars = content.len(), "completion received");
            return Ok(content);
        }

        Err(last_error.unwrap_or_else(|| OracleError::Api("Max retries exceeded".to_string())))
    }

    // Anthropic chat completion
    async fn complete_anthropic(&self, system: &str, user: &str) -> OracleResult<String> {
        let url = "https://api.anthropic.com/v1/messages";

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 8192,
            system: Some(system.to_string()),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        const MAX_RETRIES: u32 = 3;
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = std::time::Duration::from_secs(1 << attempt);
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(OracleError::Api(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(OracleError::Api(format!(
                    "Anthropic API error {} (attempt {}/{}): {}",
                    status,
                    attempt + 1,
                    MAX_RETRIES,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(OracleError::Api(format!(
                    "Anthropic API error {}: {}",
                    status, body
                )));
            }

            let result: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| OracleError::Api(format!("Failed to parse response: {}", e)))?;

            let content = result
                .content
                .first()
                .map(|c| c.text.clone())
                .ok_or_else(|| OracleError::Api("No response from Anthropic".to_string()))?;

            debug!(model = %self.model, chars = content.len(), "completion received");
            return Ok(content);
        }

        Err(last_error.unwrap_or_else(|| OracleError::Api("Max retries exceeded".to_string())))
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_detection() {
        // Clear env vars for predictable test
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("REMEDY_LLM_MODEL");

        // Should fail when no keys are set
        assert!(LlmAdapter::from_env().is_err());

        // Test with OpenAI key
        std::env::set_var("OPENAI_API_KEY", "test-key");
        let adapter = LlmAdapter::from_env().unwrap();
        assert_eq!(adapter.provider(), LlmProvider::OpenAI);
        std::env::remove_var("OPENAI_API_KEY");

        // Test with Anthropic key
        std::env::set_var("ANTHROPIC_API_KEY", "test-key");
        let adapter = LlmAdapter::from_env().unwrap();
        assert_eq!(adapter.provider(), LlmProvider::Anthropic);
        std::env::remove_var("ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_custom_model() {
        let adapter = LlmAdapter::new(
            LlmProvider::OpenAI,
            "key".to_string(),
            Some("gpt-4o".to_string()),
        );
        assert_eq!(adapter.model(), "gpt-4o");
    }
}
