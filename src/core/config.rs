//! Configuration management for Canvasflow.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion provider settings
    pub ai: AiConfig,

    /// Content store and identifier registry settings
    pub store: StoreConfig,

    /// Stage graph settings
    pub workflow: WorkflowConfig,

    /// Document service settings
    pub documents: DocumentsConfig,
}

/// Completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Preferred provider (openai, claude, ollama)
    pub provider: String,

    /// Model used for classification and the final response
    pub model: Option<String>,

    /// Model used by the code generator
    pub code_model: Option<String>,

    /// Model used by the document generator
    pub document_model: Option<String>,

    /// Temperature for classification and response prompts
    pub main_temperature: f32,

    /// Temperature for code generation
    pub code_temperature: f32,

    /// Temperature for document generation
    pub document_temperature: f32,

    /// Upper bound on a single completion call, in seconds
    pub request_timeout_secs: u64,

    /// Retries after a failed completion call
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds
    pub retry_delay_ms: u64,

    /// Maximum tokens requested per completion
    pub max_tokens: u32,

    /// Override for the provider base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Content store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory for records and the registry file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Minimum similarity a fuzzy key match must exceed
    pub similarity_threshold: f64,

    /// Number of identifiers kept in the registry (1 to 10)
    pub recent_limit: usize,
}

/// Stage graph settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Deadline for a whole graph traversal, in seconds
    pub request_timeout_secs: u64,

    /// Maximum length of a generated identifier slug
    pub slug_max_len: usize,

    /// Language used when classification is inconclusive
    pub default_language: String,

    /// Format used when classification is inconclusive
    pub default_format: String,
}

/// Document service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Base URL of the document service (processing is disabled when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Timeout for each document service call, in seconds
    pub timeout_secs: u64,

    /// Number of chunks requested from semantic search
    pub top_k: usize,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.canvasflow.toml` in current directory
    /// 2. `~/.config/canvasflow/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".canvasflow.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the global config file path.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("canvasflow").join("config.toml"))
    }

    /// Get the data directory path (records, registry).
    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.store.data_dir {
            return Ok(dir.clone());
        }

        dirs::data_dir()
            .map(|d| d.join("canvasflow"))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
    }
}

impl AiConfig {
    /// Per-attempt timeout for completion calls.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Delay before the first completion retry.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl WorkflowConfig {
    /// Deadline for one request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl DocumentsConfig {
    /// Timeout for each document service call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            code_model: None,
            document_model: None,
            main_temperature: 0.7,
            code_temperature: 0.2,
            document_temperature: 0.7,
            request_timeout_secs: 60,
            max_retries: 1,
            retry_delay_ms: 500,
            max_tokens: 4096,
            base_url: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { data_dir: None, similarity_threshold: 0.5, recent_limit: 10 }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 300,
            slug_max_len: 48,
            default_language: "py".to_string(),
            default_format: "md".to_string(),
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self { url: None, timeout_secs: 30, top_k: 4 }
    }
}
