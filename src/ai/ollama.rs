//! Ollama local LLM integration.
//!
//! Implements the CompletionProvider trait for Ollama's chat endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionProvider, CompletionRequest, ModelSet};
use crate::core::AiConfig;

/// Ollama API provider for local LLM.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    models: ModelSet,
}

impl OllamaProvider {
    /// Create a new Ollama provider with default settings.
    ///
    /// Uses localhost:11434 by default.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            models: ModelSet::uniform(
                std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            ),
        }
    }

    /// Create a provider with models from configuration.
    pub fn from_config(config: &AiConfig) -> Self {
        let mut provider = Self::new();
        provider.models = provider.models.with_overrides(config);
        if let Some(url) = &config.base_url {
            provider.base_url.clone_from(url);
        }
        provider
    }

    /// Create with a specific base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Create with a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.models = ModelSet::uniform(model);
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.models.for_role(request.role).to_string(),
            messages: vec![
                OllamaMessage { role: "system".to_string(), content: request.system.clone() },
                OllamaMessage { role: "user".to_string(), content: request.human.clone() },
            ],
            stream: false,
            format: request.expect_json.then(|| "json".to_string()),
            options: request.temperature.map(|temperature| OllamaOptions { temperature }),
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error ({}): {}", status, body);
        }

        let response: OllamaChatResponse = response.json().await?;
        Ok(response.message.content)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }
}

/// Ollama chat request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

/// Sampling options.
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Chat message.
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// Ollama chat response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}
