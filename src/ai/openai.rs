//! OpenAI API integration.
//!
//! Implements the CompletionProvider trait for OpenAI chat models.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionProvider, CompletionRequest, ModelSet};
use crate::core::AiConfig;

const DEFAULT_MODEL: &str = "gpt-4.1";

/// OpenAI API provider.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    models: ModelSet,
    base_url: String,
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    ///
    /// Reads API key from OPENAI_API_KEY environment variable.
    pub fn new() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            models: ModelSet::uniform(DEFAULT_MODEL),
            base_url: "https://api.openai.com/v1".to_string(),
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

    /// Create with a specific model for every role.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.models = ModelSet::uniform(model);
        self
    }

    /// Create with a custom base URL (for compatible APIs).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.models.for_role(request.role).to_string(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: request.system.clone() },
                ChatMessage { role: "user".to_string(), content: request.human.clone() },
            ],
            max_tokens: Some(self.max_tokens),
            temperature: request.temperature,
            response_format: request
                .expect_json
                .then(|| ResponseFormat { kind: "json_object".to_string() }),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, body);
        }

        let response: OpenAIResponse = response.json().await?;

        response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("No response from OpenAI"))
    }

    fn name(&self) -> &str {
        "openai"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// OpenAI API request structure.
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// Structured output mode.
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

/// Chat message.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// OpenAI API response structure.
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

/// Choice in an OpenAI response.
#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}
