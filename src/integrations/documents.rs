//! Document service client.
//!
//! The document service embeds uploaded files and answers similarity
//! queries over them. Every call is `POST {url}/tools/{method}` with a
//! `{"data": {...}}` body, answered by a `{success, data, error}` envelope.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::DocumentsConfig;

/// A chunk returned by semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantDocument {
    /// Chunk text
    pub content: String,

    /// Source metadata (file, page, ...)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Result type for document service operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Error types for document service calls.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Document service error ({0}): {1}")]
    Status(reqwest::StatusCode, String),

    #[error("{method} failed: {message}")]
    Failed { method: String, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Document service not configured")]
    NotConfigured,
}

/// Document processing and similarity search.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Ingest a document; returns the service's status message.
    async fn process_document(
        &self,
        path: &Path,
        metadata: &serde_json::Value,
    ) -> DocumentResult<String>;

    /// Return the `k` chunks most similar to `query`, best first.
    async fn semantic_search(&self, query: &str, k: usize) -> DocumentResult<Vec<RelevantDocument>>;
}

/// Response envelope shared by all service methods.
#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

impl Envelope {
    fn into_data<T: DeserializeOwned>(self, method: &str) -> DocumentResult<T> {
        if !self.success {
            return Err(DocumentError::Failed {
                method: method.to_string(),
                message: self.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        serde_json::from_value(self.data)
            .map_err(|e| DocumentError::Malformed(format!("{method}: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct ProcessData {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    documents: Vec<RelevantDocument>,
}

/// HTTP client for the document service.
#[derive(Debug, Clone)]
pub struct HttpDocumentService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDocumentService {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> DocumentResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    /// Create from configuration; `None` when no URL is configured.
    pub fn from_config(config: &DocumentsConfig) -> DocumentResult<Option<Self>> {
        config.url.as_deref().map(|url| Self::new(url, config.timeout())).transpose()
    }

    /// Invoke one service method.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        data: serde_json::Value,
    ) -> DocumentResult<T> {
        tracing::debug!(method, "Calling document service");

        let response = self
            .client
            .post(format!("{}/tools/{}", self.base_url, method))
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocumentError::Status(status, body));
        }

        let envelope: Envelope = response.json().await?;
        envelope.into_data(method)
    }
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn process_document(
        &self,
        path: &Path,
        metadata: &serde_json::Value,
    ) -> DocumentResult<String> {
        let data: ProcessData = self
            .call(
                "process_document",
                serde_json::json!({ "file_path": path.display().to_string(), "metadata": metadata }),
            )
            .await?;
        Ok(data.message)
    }

    async fn semantic_search(&self, query: &str, k: usize) -> DocumentResult<Vec<RelevantDocument>> {
        let data: SearchData =
            self.call("semantic_search", serde_json::json!({ "query": query, "k": k })).await?;
        Ok(data.documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_success() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"success": true, "data": {"documents": [{"content": "chunk", "metadata": {"page": 2}}]}}"#,
        )
        .unwrap();

        let data: SearchData = envelope.into_data("semantic_search").unwrap();
        assert_eq!(data.documents.len(), 1);
        assert_eq!(data.documents[0].content, "chunk");
        assert_eq!(data.documents[0].metadata["page"], 2);
    }

    #[test]
    fn test_envelope_failure() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"success": false, "error": "file not found"}"#).unwrap();

        let err = envelope.into_data::<ProcessData>("process_document").unwrap_err();
        assert_eq!(err.to_string(), "process_document failed: file not found");
    }

    #[test]
    fn test_envelope_missing_fields() {
        let envelope: Envelope = serde_json::from_str(r#"{"success": true, "data": {}}"#).unwrap();
        assert!(matches!(
            envelope.into_data::<ProcessData>("process_document"),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_from_config_without_url() {
        assert!(HttpDocumentService::from_config(&DocumentsConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let service =
            HttpDocumentService::new("http://localhost:8001/", Duration::from_secs(1)).unwrap();
        assert_eq!(service.base_url, "http://localhost:8001");
    }
}
