//! Claude API integration.
//!
//! Implements the CompletionProvider trait for Claude.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionProvider, CompletionRequest, ModelSet};
use crate::core::AiConfig;

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Claude has no JSON mode; the instruction is appended to the system prompt.
const JSON_ONLY: &str = "\n\nRespond with a single JSON object and nothing else.";

/// Claude API provider.
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    models: ModelSet,
    base_url: String,
    max_tokens: u32,
}

impl ClaudeProvider {
    /// Create a new Claude provider.
    ///
    /// Reads API key from ANTHROPIC_API_KEY environment variable.
    pub fn new() -> anyhow::Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY not set"))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            models: ModelSet::uniform(DEFAULT_MODEL),
            base_url: "https://api.anthropic.com/v1".to_string(),
            max_tokens: 4096,
        })
    }

    /// Create a provider with models and limits from configuration.
    pub fn from_config(config: &AiConfig) -> anyhow::Result<Self> {
        let mut provider = Self::new()?;
        provider.models = provider.models.with_overrides(config);
        provider.max_tokens = config.max_tokens;
        if let Some(url) = &config.base_url {
            provider.base_url.clone_from(url);
        }
        Ok(provider)
    }

    /// Create with a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.models = ModelSet::uniform(model);
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> ClaudeRequest {
        let mut system = request.system.clone();
        if request.expect_json {
            system.push_str(JSON_ONLY);
        }

        ClaudeRequest {
            model: self.models.for_role(request.role).to_string(),
            max_tokens: self.max_tokens,
            system,
            temperature: request.temperature,
            messages: vec![Message { role: "user".to_string(), content: request.human.clone() }],
        }
    }
}

#[async_trait]
impl CompletionProvider for ClaudeProvider {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        let response: ClaudeResponse = response.json().await?;

        response
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| anyhow::anyhow!("No response from Claude"))
    }

    fn name(&self) -> &str {
        "claude"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Claude API request structure.
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<Message>,
}

/// Message in a Claude request.
#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

/// Claude API response structure.
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

/// Content block in a Claude response.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_claude_provider_creation_fails_without_key() {
        std::env::remove_var("ANTHROPIC_API_KEY");
        assert!(ClaudeProvider::new().is_err());
    }

    #[test]
    #[serial]
    fn test_json_instruction_appended() {
        std::env::set_var("ANTHROPIC_API_KEY", "test-key");
        let provider = ClaudeProvider::new().unwrap();
        std::env::remove_var("ANTHROPIC_API_KEY");

        let body = provider.build_request(&CompletionRequest::json("Classify.", "hi"));
        assert!(body.system.starts_with("Classify."));
        assert!(body.system.ends_with(JSON_ONLY));

        let body = provider.build_request(&CompletionRequest::new("Answer.", "hi"));
        assert_eq!(body.system, "Answer.");
    }
}
