//! Web search.
//!
//! No search backend is wired in yet; results are always empty.

use serde::{Deserialize, Serialize};

/// Results of one web search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSearchResults {
    /// Query that was searched
    pub query: String,

    /// Result snippets
    pub results: Vec<serde_json::Value>,
}

/// Search the web for `query`.
pub async fn search(query: &str) -> WebSearchResults {
    tracing::debug!(query, "Web search requested");
    WebSearchResults { query: query.to_string(), results: Vec::new() }
}
