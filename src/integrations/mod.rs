//! External services consulted by the workflow.
//!
//! - Document service: processing and semantic search over uploaded files
//! - Web search (not backed by a real service yet)

pub mod documents;
pub mod web_search;

pub use documents::{
    DocumentError, DocumentResult, DocumentService, HttpDocumentService, RelevantDocument,
};
pub use web_search::WebSearchResults;
