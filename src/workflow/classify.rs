//! Classification cascade.
//!
//! Query-Type decides simple vs complex (and settles update detection and the
//! artifact identifier), Generator-Type picks code vs document, and the
//! Language / Format stages pick the concrete target.

use serde::Deserialize;

use super::detect::{detect_update, generate_identifier};
use super::error::{WorkflowError, WorkflowResult};
use super::graph::StageId;
use super::prompts;
use super::query::{
    CodeLanguage, ComplexQuery, DocumentFormat, GenerationTarget, GeneratorKind, Query,
    QueryAction, SimpleQuery,
};
use super::services::Services;
use super::state::RequestState;
use crate::ai::CompletionRequest;
use crate::store::{normalize_identifier, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum QueryKind {
    Simple,
    Complex,
}

#[derive(Debug, Deserialize)]
struct QueryClassification {
    #[serde(rename = "type")]
    kind: QueryKind,
    #[serde(default)]
    needs_web_search: bool,
    #[serde(default)]
    needs_document_processing: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratorReply {
    generator_type: String,
}

#[derive(Debug, Deserialize)]
struct LanguageReply {
    language: String,
}

#[derive(Debug, Deserialize)]
struct FormatReply {
    format: String,
}

/// Query-Type stage.
///
/// Runs update detection, classifies the request, and for complex requests
/// settles the artifact identifier and records it in the registry. A detected
/// update is always complex.
pub async fn query_type(services: &Services, state: &mut RequestState) -> WorkflowResult<()> {
    let content = state
        .last_user_message()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or(WorkflowError::EmptyQuery)?
        .to_string();

    let detection = detect_update(services, &content).await;

    let request = CompletionRequest::json(prompts::QUERY_TYPE, content.clone())
        .with_temperature(services.settings.main_temperature);
    let classification =
        services.completion.complete_json::<QueryClassification>(&request).await;

    let (kind, needs_web_search, mut needs_document_processing) = match classification {
        Ok(c) => (c.kind, c.needs_web_search, c.needs_document_processing),
        Err(e) if detection.is_update => {
            state.context.note_error(StageId::QueryType, e.to_string());
            (QueryKind::Complex, false, false)
        }
        Err(e) => return Err(e.into()),
    };
    let kind = if detection.is_update { QueryKind::Complex } else { kind };
    needs_document_processing |= state.context.document_path.is_some();

    state.set_flag("needs_web_search", needs_web_search);
    state.set_flag("needs_document_processing", needs_document_processing);
    state.set_flag("is_update", detection.is_update);

    if kind == QueryKind::Simple {
        state.query = Query::Simple(SimpleQuery {
            content,
            needs_web_search,
            needs_document_processing,
        });
        tracing::info!("Query classified as simple");
        return Ok(());
    }

    // A target set before this stage ran is kept
    let target = state.query.target();
    let file_identifier = match detection.identifier {
        Some(identifier) => identifier,
        None => generate_identifier(services, &content).await,
    };

    if let Err(e) = record_identifier(services, &file_identifier, detection.is_update) {
        state.context.note_error(StageId::QueryType, format!("Registry update failed: {e}"));
    }

    let action = if detection.is_update { QueryAction::Update } else { QueryAction::New };
    tracing::info!(identifier = %file_identifier, action = ?action, "Query classified as complex");

    state.query = Query::Complex(ComplexQuery {
        content,
        needs_web_search,
        needs_document_processing,
        target,
        action,
        file_identifier: Some(file_identifier),
        previous_content: None,
    });
    Ok(())
}

/// Record the identifier under the spelling its record is stored with.
///
/// An update names its artifact loosely ("invoice-report"); the registry gets
/// the key Content-Retrieval will settle on ("invoice_report").
fn record_identifier(services: &Services, identifier: &str, is_update: bool) -> StoreResult<()> {
    let resolved = if is_update { services.store.content().resolve(identifier) } else { None };
    let canonical = match resolved {
        Some(found) => found.identifier(),
        None => normalize_identifier(identifier)?,
    };
    services.store.registry().record(&canonical)
}

/// Generator-Type stage.
///
/// No-op unless the query is complex with no generator chosen. Metadata of
/// the artifact being revised wins over the model.
pub async fn generator_type(services: &Services, state: &mut RequestState) -> WorkflowResult<()> {
    let Some(query) = state.query.as_complex_mut() else {
        return Ok(());
    };
    if query.target != GenerationTarget::None {
        return Ok(());
    }

    let recorded = state
        .context
        .previous_metadata
        .as_ref()
        .and_then(|m| m.generator_type.as_deref())
        .and_then(|t| t.parse::<GeneratorKind>().ok())
        .filter(|k| *k != GeneratorKind::None);

    let kind = match recorded {
        Some(kind) => kind,
        None => {
            let request = CompletionRequest::json(prompts::GENERATOR_TYPE, query.content.clone())
                .with_temperature(services.settings.main_temperature);
            let reply: GeneratorReply = services.completion.complete_json(&request).await?;
            reply
                .generator_type
                .parse::<GeneratorKind>()
                .ok()
                .filter(|k| *k != GeneratorKind::None)
                .ok_or_else(|| {
                    WorkflowError::Classification(format!(
                        "unknown generator type {:?}",
                        reply.generator_type
                    ))
                })?
        }
    };

    query.target = GenerationTarget::for_kind(kind);
    tracing::info!(generator = kind.tag(), "Generator type classified");
    Ok(())
}

/// Language stage.
///
/// No-op unless the target is code without a language. Falls back to the
/// configured default when the answer is unusable.
pub async fn language(services: &Services, state: &mut RequestState) -> WorkflowResult<()> {
    let Some(query) = state.query.as_complex_mut() else {
        return Ok(());
    };
    if query.target != GenerationTarget::Code(None) {
        return Ok(());
    }

    let recorded = state
        .context
        .previous_metadata
        .as_ref()
        .and_then(|m| m.code_language.as_deref())
        .and_then(|l| l.parse::<CodeLanguage>().ok());
    if let Some(language) = recorded {
        query.target = GenerationTarget::Code(Some(language));
        tracing::info!(language = language.tag(), "Language taken from previous revision");
        return Ok(());
    }

    let request = CompletionRequest::json(prompts::LANGUAGE, query.content.clone())
        .with_temperature(services.settings.main_temperature);
    let outcome = services.completion.complete_json::<LanguageReply>(&request).await;

    let (language, failure) = match outcome {
        Ok(reply) => match reply.language.parse::<CodeLanguage>() {
            Ok(language) => (language, None),
            Err(e) => {
                tracing::warn!(error = %e, "Unrecognized language, using default");
                (services.settings.default_language, None)
            }
        },
        Err(e) => (services.settings.default_language, Some(e)),
    };

    query.target = GenerationTarget::Code(Some(language));
    tracing::info!(language = language.tag(), "Language classified");
    failure.map_or(Ok(()), |e| Err(e.into()))
}

/// Format stage.
///
/// No-op unless the target is a document without a format. Falls back to the
/// configured default when the answer is unusable.
pub async fn format(services: &Services, state: &mut RequestState) -> WorkflowResult<()> {
    let Some(query) = state.query.as_complex_mut() else {
        return Ok(());
    };
    if query.target != GenerationTarget::Document(None) {
        return Ok(());
    }

    let recorded = state
        .context
        .previous_metadata
        .as_ref()
        .and_then(|m| m.document_format.as_deref())
        .and_then(|f| f.parse::<DocumentFormat>().ok());
    if let Some(format) = recorded {
        query.target = GenerationTarget::Document(Some(format));
        tracing::info!(format = format.tag(), "Format taken from previous revision");
        return Ok(());
    }

    let request = CompletionRequest::json(prompts::FORMAT, query.content.clone())
        .with_temperature(services.settings.main_temperature);
    let outcome = services.completion.complete_json::<FormatReply>(&request).await;

    let (format, failure) = match outcome {
        Ok(reply) => match reply.format.parse::<DocumentFormat>() {
            Ok(format) => (format, None),
            Err(e) => {
                tracing::warn!(error = %e, "Unrecognized format, using default");
                (services.settings.default_format, None)
            }
        },
        Err(e) => (services.settings.default_format, Some(e)),
    };

    query.target = GenerationTarget::Document(Some(format));
    tracing::info!(format = format.tag(), "Format classified");
    failure.map_or(Ok(()), |e| Err(e.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ai::testing::ScriptedProvider;
    use crate::store::RecordMetadata;
    use crate::workflow::services::testing::services;

    fn complex(target: GenerationTarget) -> RequestState {
        let mut state = RequestState::new(Vec::new(), "build it");
        state.query = Query::Complex(ComplexQuery {
            content: "build it".to_string(),
            target,
            ..ComplexQuery::default()
        });
        state
    }

    #[tokio::test]
    async fn test_simple_query() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"is_update": false}"#,
            r#"{"type": "simple", "needs_web_search": true, "needs_document_processing": false}"#,
        ]));
        let (_dir, services) = services(provider);
        let mut state = RequestState::new(Vec::new(), "who won yesterday?");

        query_type(&services, &mut state).await.unwrap();

        assert!(matches!(state.query, Query::Simple(_)));
        assert!(state.query.needs_web_search());
        assert_eq!(state.task_flags.get("needs_web_search"), Some(&true));
        assert!(services.store.registry().recent().is_empty());
    }

    #[tokio::test]
    async fn test_complex_query_gets_identifier() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"is_update": false}"#,
            r#"{"type": "complex", "needs_web_search": false, "needs_document_processing": false}"#,
            "prime_sieve",
        ]));
        let (_dir, services) = services(provider);
        let mut state = RequestState::new(Vec::new(), "write a prime sieve");

        query_type(&services, &mut state).await.unwrap();

        let query = state.query.as_complex().unwrap();
        assert_eq!(query.action, QueryAction::New);
        assert_eq!(query.file_identifier.as_deref(), Some("prime_sieve"));
        assert_eq!(services.store.registry().last_identifier().as_deref(), Some("prime_sieve"));
    }

    #[tokio::test]
    async fn test_update_forces_complex() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"type": "simple", "needs_web_search": false, "needs_document_processing": false}"#,
        ]));
        let (_dir, services) = services(provider.clone());
        let mut state = RequestState::new(Vec::new(), "Update the sales_chart file to add totals");

        query_type(&services, &mut state).await.unwrap();

        let query = state.query.as_complex().unwrap();
        assert_eq!(query.action, QueryAction::Update);
        assert_eq!(query.file_identifier.as_deref(), Some("sales_chart"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_update_records_stored_spelling() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"type": "complex", "needs_web_search": false, "needs_document_processing": false}"#,
        ]));
        let (_dir, services) = services(provider);
        services
            .store
            .content()
            .save("invoice_report", "# Invoices", crate::store::RecordMetadata::default(), false)
            .unwrap();
        let mut state = RequestState::new(Vec::new(), "Update the invoice-report file to add totals");

        query_type(&services, &mut state).await.unwrap();

        assert_eq!(services.store.registry().recent(), vec!["invoice_report".to_string()]);
    }

    #[tokio::test]
    async fn test_unparseable_classification_stays_simple() {
        let provider =
            Arc::new(ScriptedProvider::new([r#"{"is_update": false}"#, "I think it is complex"]));
        let (_dir, services) = services(provider);
        let mut state = RequestState::new(Vec::new(), "hello there");

        let err = query_type(&services, &mut state).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Completion(_)));
        assert!(matches!(state.query, Query::Simple(_)));
    }

    #[tokio::test]
    async fn test_empty_message() {
        let (_dir, services) = services(Arc::new(ScriptedProvider::default()));
        let mut state = RequestState::new(Vec::new(), "   ");
        assert!(matches!(
            query_type(&services, &mut state).await,
            Err(WorkflowError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn test_generator_type_from_model() {
        let provider = Arc::new(ScriptedProvider::new([r#"{"generator_type": "document"}"#]));
        let (_dir, services) = services(provider);
        let mut state = complex(GenerationTarget::None);

        generator_type(&services, &mut state).await.unwrap();
        assert_eq!(state.query.target(), GenerationTarget::Document(None));
    }

    #[tokio::test]
    async fn test_generator_type_prefers_previous_metadata() {
        let provider = Arc::new(ScriptedProvider::default());
        let (_dir, services) = services(provider.clone());
        let mut state = complex(GenerationTarget::None);
        state.context.previous_metadata = Some(RecordMetadata {
            generator_type: Some("code".to_string()),
            ..RecordMetadata::default()
        });

        generator_type(&services, &mut state).await.unwrap();
        assert_eq!(state.query.target(), GenerationTarget::Code(None));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_generator_type_rejects_none() {
        let provider = Arc::new(ScriptedProvider::new([r#"{"generator_type": "none"}"#]));
        let (_dir, services) = services(provider);
        let mut state = complex(GenerationTarget::None);

        assert!(matches!(
            generator_type(&services, &mut state).await,
            Err(WorkflowError::Classification(_))
        ));
        assert_eq!(state.query.target(), GenerationTarget::None);
    }

    #[tokio::test]
    async fn test_language_classified() {
        let provider = Arc::new(ScriptedProvider::new([r#"{"language": "typescript"}"#]));
        let (_dir, services) = services(provider);
        let mut state = complex(GenerationTarget::Code(None));

        language(&services, &mut state).await.unwrap();
        assert_eq!(state.query.target(), GenerationTarget::Code(Some(CodeLanguage::TypeScript)));
    }

    #[tokio::test]
    async fn test_language_unrecognized_uses_default() {
        let provider = Arc::new(ScriptedProvider::new([r#"{"language": "brainfuck"}"#]));
        let (_dir, services) = services(provider);
        let mut state = complex(GenerationTarget::Code(None));

        language(&services, &mut state).await.unwrap();
        assert_eq!(state.query.target(), GenerationTarget::Code(Some(CodeLanguage::Python)));
    }

    #[tokio::test]
    async fn test_language_skips_document_target() {
        let provider = Arc::new(ScriptedProvider::default());
        let (_dir, services) = services(provider.clone());
        let mut state = complex(GenerationTarget::Document(None));

        language(&services, &mut state).await.unwrap();
        assert_eq!(state.query.target(), GenerationTarget::Document(None));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_format_from_previous_metadata() {
        let provider = Arc::new(ScriptedProvider::default());
        let (_dir, services) = services(provider.clone());
        let mut state = complex(GenerationTarget::Document(None));
        state.context.previous_metadata = Some(RecordMetadata {
            document_format: Some("txt".to_string()),
            ..RecordMetadata::default()
        });

        format(&services, &mut state).await.unwrap();
        assert_eq!(state.query.target(), GenerationTarget::Document(Some(DocumentFormat::Text)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_format_failure_still_sets_default() {
        let provider = Arc::new(ScriptedProvider::default());
        let (_dir, services) = services(provider);
        let mut state = complex(GenerationTarget::Document(None));

        assert!(format(&services, &mut state).await.is_err());
        assert_eq!(
            state.query.target(),
            GenerationTarget::Document(Some(DocumentFormat::Markdown))
        );
    }
}
