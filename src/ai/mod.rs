//! Completion capability.
//!
//! Every stage that needs a language model goes through [`CompletionClient`],
//! which wraps one or more [`CompletionProvider`]s with a per-attempt timeout,
//! a single retry with backoff, and provider fallback.
//!
//! ## Providers
//!
//! - OpenAI chat completions (`OPENAI_API_KEY`)
//! - Claude messages API (`ANTHROPIC_API_KEY`)
//! - Ollama local models (`OLLAMA_HOST`, `OLLAMA_MODEL`)

mod claude;
mod json;
mod ollama;
mod openai;

pub use claude::ClaudeProvider;
pub use json::parse_json_reply;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::core::{retry_async, AiConfig, AttemptError, RetryConfig};

/// Which model slot a request should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelRole {
    /// Classification and final responses
    #[default]
    Main,
    /// Code generation
    Code,
    /// Document generation
    Document,
}

/// A single prompt sent to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System prompt
    pub system: String,

    /// Human turn
    pub human: String,

    /// Whether the reply must be a JSON object
    pub expect_json: bool,

    /// Sampling temperature (provider default when unset)
    pub temperature: Option<f32>,

    /// Model slot to use
    pub role: ModelRole,
}

impl CompletionRequest {
    /// Create a free-text request.
    pub fn new(system: impl Into<String>, human: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            human: human.into(),
            expect_json: false,
            temperature: None,
            role: ModelRole::Main,
        }
    }

    /// Create a request whose reply must be a JSON object.
    pub fn json(system: impl Into<String>, human: impl Into<String>) -> Self {
        Self { expect_json: true, ..Self::new(system, human) }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the model slot.
    pub fn with_role(mut self, role: ModelRole) -> Self {
        self.role = role;
        self
    }
}

/// Model names per role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSet {
    pub main: String,
    pub code: String,
    pub document: String,
}

impl ModelSet {
    /// Use the same model for every role.
    pub fn uniform(model: impl Into<String>) -> Self {
        let model = model.into();
        Self { main: model.clone(), code: model.clone(), document: model }
    }

    /// Apply per-role overrides from configuration.
    pub fn with_overrides(mut self, config: &AiConfig) -> Self {
        if let Some(model) = &config.model {
            self.main.clone_from(model);
            self.code.clone_from(model);
            self.document.clone_from(model);
        }
        if let Some(model) = &config.code_model {
            self.code.clone_from(model);
        }
        if let Some(model) = &config.document_model {
            self.document.clone_from(model);
        }
        self
    }

    /// Model for a role.
    pub fn for_role(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Main => &self.main,
            ModelRole::Code => &self.code,
            ModelRole::Document => &self.document,
        }
    }
}

/// Trait for completion providers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one prompt and return the reply text.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;

    /// Get the provider name.
    fn name(&self) -> &str;

    /// Check if the provider is available.
    async fn is_available(&self) -> bool;
}

/// Completion error types.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Completion timed out after {0}s")]
    Timeout(u64),

    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("No response from AI")]
    NoResponse,

    #[error("Invalid JSON reply: {0}")]
    InvalidJson(String),
}

/// Completion client with timeout, retry and provider fallback.
///
/// Tries providers in order; each provider gets the configured number of
/// retries before the next one is tried.
#[derive(Clone)]
pub struct CompletionClient {
    providers: Vec<Arc<dyn CompletionProvider>>,
    retry: RetryConfig,
}

impl CompletionClient {
    /// Create a client over an explicit provider chain.
    pub fn new(providers: Vec<Arc<dyn CompletionProvider>>, retry: RetryConfig) -> Self {
        Self { providers, retry }
    }

    /// Create a client with a single provider.
    pub fn single(provider: Arc<dyn CompletionProvider>, retry: RetryConfig) -> Self {
        Self::new(vec![provider], retry)
    }

    /// Build the provider chain from configuration.
    ///
    /// The configured provider comes first; other providers with credentials
    /// follow as fallbacks. Fails when no provider can be constructed.
    pub async fn from_config(config: &AiConfig) -> anyhow::Result<Self> {
        let mut providers: Vec<Arc<dyn CompletionProvider>> = Vec::new();

        let mut order = vec![config.provider.as_str()];
        for name in ["openai", "claude", "ollama"] {
            if !order.contains(&name) {
                order.push(name);
            }
        }

        for name in order {
            let provider: Option<Arc<dyn CompletionProvider>> = match name {
                "openai" => OpenAIProvider::from_config(config)
                    .ok()
                    .map(|p| Arc::new(p) as Arc<dyn CompletionProvider>),
                "claude" => ClaudeProvider::from_config(config)
                    .ok()
                    .map(|p| Arc::new(p) as Arc<dyn CompletionProvider>),
                "ollama" => {
                    let ollama = OllamaProvider::from_config(config);
                    // Ollama needs no key; only chain it when it answers or was asked for
                    if name == config.provider || ollama.is_available().await {
                        Some(Arc::new(ollama) as Arc<dyn CompletionProvider>)
                    } else {
                        None
                    }
                }
                other => {
                    tracing::warn!(provider = other, "Unknown provider in configuration");
                    None
                }
            };

            if let Some(provider) = provider {
                tracing::debug!(provider = provider.name(), "Completion provider enabled");
                providers.push(provider);
            }
        }

        if providers.is_empty() {
            anyhow::bail!(
                "No completion provider available: set OPENAI_API_KEY or ANTHROPIC_API_KEY, or run Ollama"
            );
        }

        let retry = RetryConfig::completion(config.request_timeout(), config.retry_delay())
            .with_max_attempts(config.max_retries);
        Ok(Self::new(providers, retry))
    }

    /// Check if any provider is configured.
    pub fn is_available(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Get the active provider name.
    pub fn active_provider(&self) -> Option<&str> {
        self.providers.first().map(|p| p.name())
    }

    /// Send a prompt and return the reply text.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, AIError> {
        let mut last_error = None;

        for provider in &self.providers {
            let outcome = retry_async(&self.retry, || provider.complete(request)).await;
            let attempts = outcome.attempts;

            match outcome.into_result() {
                Ok(text) if text.trim().is_empty() => {
                    tracing::warn!(provider = provider.name(), "Provider returned an empty reply");
                    last_error = Some(AIError::NoResponse);
                }
                Ok(text) => return Ok(text),
                Err(AttemptError::TimedOut(limit)) => {
                    tracing::warn!(provider = provider.name(), attempts, "Provider timed out, trying next");
                    last_error = Some(AIError::Timeout(limit.as_secs()));
                }
                Err(AttemptError::Failed(e)) => {
                    tracing::warn!(provider = provider.name(), attempts, error = %e, "Provider failed, trying next");
                    last_error = Some(AIError::ApiError(e.to_string()));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AIError::ProviderNotAvailable("No AI provider available".to_string())))
    }

    /// Send a JSON-returning prompt and decode the reply.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        request: &CompletionRequest,
    ) -> Result<T, AIError> {
        let reply = self.complete(request).await?;
        tracing::debug!(reply = %reply, "Raw JSON reply");
        parse_json_reply(&reply)
    }
}
