//! Workflow error types.

use thiserror::Error;

use crate::ai::AIError;
use crate::integrations::DocumentError;
use crate::store::StoreError;

/// Result type for stage operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors raised inside a stage.
///
/// The graph runner turns these into a failed completion flag and a context
/// error; they never reach the caller.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A stage ran against a query it cannot handle.
    #[error("Invalid state for {0}")]
    InvalidState(&'static str),

    /// Nothing to work on.
    #[error("Query content is empty")]
    EmptyQuery,

    /// A classification reply could not be used.
    #[error("Could not parse classification: {0}")]
    Classification(String),

    /// The completion capability failed.
    #[error(transparent)]
    Completion(#[from] AIError),

    /// The document service failed.
    #[error(transparent)]
    Documents(#[from] DocumentError),

    /// Persisting an artifact failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No document path provided in context")]
    MissingDocumentPath,

    /// The request deadline passed.
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}
