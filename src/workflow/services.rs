//! Collaborators shared by all stages.

use std::sync::Arc;
use std::time::Duration;

use super::query::{CodeLanguage, DocumentFormat};
use crate::ai::CompletionClient;
use crate::core::Config;
use crate::integrations::DocumentService;
use crate::store::Store;

/// Tunables the stages read.
#[derive(Debug, Clone)]
pub struct StageSettings {
    pub main_temperature: f32,
    pub code_temperature: f32,
    pub document_temperature: f32,

    /// Longest identifier slug produced for new artifacts
    pub slug_max_len: usize,

    /// Language used when classification is inconclusive
    pub default_language: CodeLanguage,

    /// Format used when classification is inconclusive
    pub default_format: DocumentFormat,

    /// Chunks requested from semantic search
    pub top_k: usize,

    /// Deadline for one graph traversal
    pub request_timeout: Duration,
}

impl StageSettings {
    /// Read settings from configuration.
    ///
    /// Unknown default language or format tags fall back to `py` and `md`.
    pub fn from_config(config: &Config) -> Self {
        let default_language = config.workflow.default_language.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid default language, using py");
            CodeLanguage::Python
        });
        let default_format = config.workflow.default_format.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid default format, using md");
            DocumentFormat::Markdown
        });

        Self {
            main_temperature: config.ai.main_temperature,
            code_temperature: config.ai.code_temperature,
            document_temperature: config.ai.document_temperature,
            slug_max_len: config.workflow.slug_max_len.max(8),
            default_language,
            default_format,
            top_k: config.documents.top_k.max(1),
            request_timeout: config.workflow.request_timeout(),
        }
    }
}

impl Default for StageSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Everything a stage may call out to.
#[derive(Clone)]
pub struct Services {
    pub completion: CompletionClient,
    pub store: Arc<Store>,
    pub documents: Option<Arc<dyn DocumentService>>,
    pub settings: StageSettings,
}

impl Services {
    pub fn new(completion: CompletionClient, store: Arc<Store>, settings: StageSettings) -> Self {
        Self { completion, store, documents: None, settings }
    }

    /// Attach a document service.
    pub fn with_documents(mut self, documents: Arc<dyn DocumentService>) -> Self {
        self.documents = Some(documents);
        self
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_default_config() {
        let settings = StageSettings::default();
        assert_eq!(settings.default_language, CodeLanguage::Python);
        assert_eq!(settings.default_format, DocumentFormat::Markdown);
        assert_eq!(settings.top_k, 4);
        assert_eq!(settings.slug_max_len, 48);
        assert_eq!(settings.request_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_invalid_defaults_fall_back() {
        let mut config = Config::default();
        config.workflow.default_language = "cobol".to_string();
        config.workflow.default_format = "typescript".to_string();

        let settings = StageSettings::from_config(&config);
        assert_eq!(settings.default_language, CodeLanguage::Python);
        assert_eq!(settings.default_format, DocumentFormat::Markdown);
    }
}
