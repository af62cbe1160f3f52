//! Content-Retrieval stage.

use std::path::Path;

use super::error::WorkflowResult;
use super::query::{CodeLanguage, DocumentFormat, GenerationTarget, GeneratorKind, QueryAction};
use super::services::Services;
use super::state::RequestState;

/// Load the artifact an update refers to.
///
/// No-op unless the query is a complex update. A hit copies the body into
/// `previous_content`, its metadata into the context, and rewrites the
/// identifier to the stored key so the revision lands on the same record.
/// A miss demotes the request to a new artifact.
pub async fn content_retrieval(services: &Services, state: &mut RequestState) -> WorkflowResult<()> {
    let Some(query) = state.query.as_complex_mut() else {
        return Ok(());
    };
    if query.action != QueryAction::Update {
        return Ok(());
    }

    let resolved = query
        .file_identifier
        .as_deref()
        .and_then(|id| services.store.content().resolve(id))
        .filter(|found| !found.record.is_empty());

    let Some(found) = resolved else {
        tracing::info!(
            identifier = ?query.file_identifier,
            "No stored content for update, generating new artifact"
        );
        query.action = QueryAction::New;
        query.previous_content = None;
        return Ok(());
    };

    let key = Path::new(&found.key)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(found.key.as_str())
        .to_string();
    let metadata = found.record.metadata;

    if query.target == GenerationTarget::None {
        query.target = recorded_target(
            metadata.generator_type.as_deref(),
            metadata.code_language.as_deref(),
            metadata.document_format.as_deref(),
        );
    }

    tracing::info!(
        identifier = ?query.file_identifier,
        key = %key,
        bytes = found.record.content.len(),
        "Retrieved content for update"
    );
    query.file_identifier = Some(key);
    query.previous_content = Some(found.record.content);
    state.context.previous_metadata = Some(metadata);
    Ok(())
}

/// Target recorded with a stored artifact.
fn recorded_target(
    generator: Option<&str>,
    language: Option<&str>,
    format: Option<&str>,
) -> GenerationTarget {
    match generator.and_then(|g| g.parse::<GeneratorKind>().ok()) {
        Some(GeneratorKind::Code) => {
            GenerationTarget::Code(language.and_then(|l| l.parse::<CodeLanguage>().ok()))
        }
        Some(GeneratorKind::Document) => {
            GenerationTarget::Document(format.and_then(|f| f.parse::<DocumentFormat>().ok()))
        }
        _ => GenerationTarget::None,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use super::*;
    use crate::ai::testing::ScriptedProvider;
    use crate::store::RecordMetadata;
    use crate::workflow::query::{ComplexQuery, Query};
    use crate::workflow::services::testing::services;

    fn update(identifier: &str) -> RequestState {
        let mut state = RequestState::new(Vec::new(), "add totals");
        state.query = Query::Complex(ComplexQuery {
            content: "add totals".to_string(),
            action: QueryAction::Update,
            file_identifier: Some(identifier.to_string()),
            ..ComplexQuery::default()
        });
        state
    }

    #[tokio::test]
    async fn test_miss_demotes_to_new() {
        let (_dir, services) = services(Arc::new(ScriptedProvider::default()));
        let mut state = update("sales_chart");

        content_retrieval(&services, &mut state).await.unwrap();

        let query = state.query.as_complex().unwrap();
        assert_eq!(query.action, QueryAction::New);
        assert_eq!(query.previous_content, None);
        assert!(state.context.previous_metadata.is_none());
    }

    #[tokio::test]
    async fn test_hit_loads_previous_content() {
        let (_dir, services) = services(Arc::new(ScriptedProvider::default()));
        let metadata = RecordMetadata {
            generator_type: Some("code".to_string()),
            code_language: Some("ts".to_string()),
            ..RecordMetadata::default()
        };
        services.store.content().save("invoice_report", "const a = 1;", metadata, false).unwrap();
        let mut state = update("invoice-report");

        content_retrieval(&services, &mut state).await.unwrap();

        let query = state.query.as_complex().unwrap();
        assert_eq!(query.action, QueryAction::Update);
        assert_eq!(query.previous_content.as_deref(), Some("const a = 1;"));
        assert_eq!(query.file_identifier.as_deref(), Some("invoice_report"));
        assert_eq!(query.target, GenerationTarget::Code(Some(CodeLanguage::TypeScript)));
        assert!(state.context.previous_metadata.is_some());
    }

    #[tokio::test]
    async fn test_legacy_file_sets_target_from_extension() {
        let (_dir, services) = services(Arc::new(ScriptedProvider::default()));
        fs::write(services.store.content().dir().join("notes.md"), "# Notes").unwrap();
        let mut state = update("notes");

        content_retrieval(&services, &mut state).await.unwrap();

        let query = state.query.as_complex().unwrap();
        assert_eq!(query.file_identifier.as_deref(), Some("notes"));
        assert_eq!(query.target, GenerationTarget::Document(Some(DocumentFormat::Markdown)));
    }

    #[tokio::test]
    async fn test_new_query_untouched() {
        let (_dir, services) = services(Arc::new(ScriptedProvider::default()));
        let mut state = update("anything");
        state.query.as_complex_mut().unwrap().action = QueryAction::New;

        content_retrieval(&services, &mut state).await.unwrap();
        assert_eq!(state.query.as_complex().unwrap().file_identifier.as_deref(), Some("anything"));
    }
}
