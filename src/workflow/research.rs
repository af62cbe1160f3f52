//! Side tasks that gather context before answering or generating.

use super::error::{WorkflowError, WorkflowResult};
use super::services::Services;
use super::state::RequestState;
use crate::integrations::{self, DocumentError};

/// Web-search stage.
pub async fn web_search(_services: &Services, state: &mut RequestState) -> WorkflowResult<()> {
    let results = integrations::web_search::search(state.query.content()).await;
    tracing::info!(results = results.results.len(), "Web search complete");
    state.context.web_search = Some(results);
    Ok(())
}

/// Document-Processing stage.
///
/// Ingests the uploaded document, then pulls the chunks most similar to the
/// query into the context.
pub async fn document_processing(services: &Services, state: &mut RequestState) -> WorkflowResult<()> {
    let path = state.context.document_path.clone().ok_or(WorkflowError::MissingDocumentPath)?;
    let documents = services.documents.as_ref().ok_or(DocumentError::NotConfigured)?;

    let status = documents.process_document(&path, &state.context.document_metadata).await?;
    tracing::info!(path = %path.display(), status = %status, "Document processed");
    state.context.processing_result = Some(status);

    let relevant = documents
        .semantic_search(state.query.content(), services.settings.top_k)
        .await?;
    tracing::info!(chunks = relevant.len(), "Semantic search complete");
    state.context.relevant_documents = relevant;
    Ok(())
}
