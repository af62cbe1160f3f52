//! Code and document generator stages.
//!
//! Both generators share one flow: build the prompt from the target's
//! guidelines, call the model once, validate the extracted artifact, and on
//! failure regenerate once with the validator's stricter prompt. The second
//! reply is accepted as is. The artifact is then persisted under the
//! query's identifier.

use super::error::{WorkflowError, WorkflowResult};
use super::extract::{extract, extract_document, Extracted};
use super::graph::StageId;
use super::prompts;
use super::query::{ComplexQuery, GenerationTarget};
use super::services::Services;
use super::state::{GenerationMetadata, GenerationOutput, RequestState, StageContext};
use super::validate::Validator;
use crate::ai::{CompletionRequest, ModelRole};
use crate::store::RecordMetadata;

/// Code generator stage.
pub async fn code_generator(services: &Services, state: &mut RequestState) -> WorkflowResult<()> {
    let query = state.query.as_complex().ok_or(WorkflowError::InvalidState("code generator"))?;
    if !matches!(query.target, GenerationTarget::Code(Some(_))) {
        return Err(WorkflowError::InvalidState("code generator"));
    }
    generate(services, state, StageId::CodeGenerator).await
}

/// Document generator stage.
pub async fn document_generator(services: &Services, state: &mut RequestState) -> WorkflowResult<()> {
    let query =
        state.query.as_complex().ok_or(WorkflowError::InvalidState("document generator"))?;
    if !matches!(query.target, GenerationTarget::Document(Some(_))) {
        return Err(WorkflowError::InvalidState("document generator"));
    }
    generate(services, state, StageId::DocumentGenerator).await
}

async fn generate(services: &Services, state: &mut RequestState, stage: StageId) -> WorkflowResult<()> {
    let query = match state.query.as_complex() {
        Some(query) => query.clone(),
        None => return Err(WorkflowError::InvalidState("generator")),
    };
    if query.content.trim().is_empty() {
        return Err(WorkflowError::EmptyQuery);
    }

    let target = query.target;
    let (guidelines, role, temperature) = match target {
        GenerationTarget::Code(Some(language)) => (
            prompts::language_guidelines(language),
            ModelRole::Code,
            services.settings.code_temperature,
        ),
        GenerationTarget::Document(Some(format)) => (
            prompts::format_guidelines(format),
            ModelRole::Document,
            services.settings.document_temperature,
        ),
        _ => return Err(WorkflowError::InvalidState("generator")),
    };

    let mut system = guidelines.to_string();
    if query.is_resolved_update() {
        system.push_str(prompts::UPDATE_INSTRUCTIONS);
    }
    let human = task_prompt(&query, &state.context);

    tracing::debug!(stage = ?stage, target = ?target, update = query.is_resolved_update(), "Generating");
    let request = CompletionRequest::new(system, human).with_role(role).with_temperature(temperature);
    let mut raw_response = services.completion.complete(&request).await?;
    let mut extracted = split(target, &raw_response);
    let mut regenerated = false;

    if let Some(validator) = Validator::for_target(target) {
        let issues = validator.check(&extracted.payload);
        if !issues.is_empty() {
            tracing::warn!(stage = ?stage, issues = ?issues, "Validation failed, regenerating");
            let retry = CompletionRequest::new(
                validator.strict_prompt(),
                format!(
                    "Improve this {} following best practices:\n{}",
                    validator.subject(),
                    extracted.payload
                ),
            )
            .with_role(role)
            .with_temperature(temperature);

            raw_response = services.completion.complete(&retry).await?;
            extracted = split(target, &raw_response);
            regenerated = true;
        }
    }

    let metadata = GenerationMetadata {
        generator_type: target.kind(),
        code_language: target.language(),
        document_format: target.format(),
        is_update: query.is_resolved_update(),
        file_identifier: query.file_identifier.clone(),
    };

    let mut output = GenerationOutput {
        raw_response,
        payload: extracted.payload,
        explanation: extracted.explanation,
        regenerated,
        metadata,
        saved_to: None,
    };

    if let Some(identifier) = &query.file_identifier {
        let mut record = output.metadata.to_record(&query.content);
        if let Some(previous) = &state.context.previous_metadata {
            carry_forward(&mut record, previous);
        }

        match services.store.content().save(identifier, &output.payload, record, output.metadata.is_update) {
            Ok(path) => output.saved_to = Some(path),
            Err(e) => state.context.note_error(stage, format!("Failed to save content: {e}")),
        }
    }

    tracing::info!(
        stage = ?stage,
        identifier = ?output.metadata.file_identifier,
        regenerated,
        bytes = output.payload.len(),
        "Generation complete"
    );
    state.context.generation = Some(output);
    Ok(())
}

/// Human turn for a generation request.
fn task_prompt(query: &ComplexQuery, context: &StageContext) -> String {
    let mut prompt = match query.previous_content.as_deref() {
        Some(previous) if query.is_resolved_update() => format!(
            "Existing content:\n```{}\n{}\n```\n\nUpdate request: {}",
            query.target.tag().unwrap_or(""),
            previous,
            query.content
        ),
        _ => format!("Task: {}", query.content),
    };

    if !context.relevant_documents.is_empty() {
        prompt.push_str("\n\nRelevant document excerpts:\n");
        for doc in &context.relevant_documents {
            prompt.push_str("- ");
            prompt.push_str(doc.content.trim());
            prompt.push('\n');
        }
    }

    if let Some(search) = context.web_search.as_ref().filter(|s| !s.results.is_empty()) {
        prompt.push_str("\n\nWeb search results:\n");
        for result in &search.results {
            prompt.push_str(&format!("- {result}\n"));
        }
    }

    prompt
}

fn split(target: GenerationTarget, reply: &str) -> Extracted {
    match target {
        GenerationTarget::Document(_) => extract_document(reply),
        _ => extract(reply),
    }
}

/// Keep metadata of the revision being replaced that this generation does not set.
fn carry_forward(record: &mut RecordMetadata, previous: &RecordMetadata) {
    if record.created_at.is_none() {
        record.created_at = previous.created_at;
    }
    for query in &previous.query_history {
        if !record.query_history.contains(query) {
            record.query_history.push(query.clone());
        }
    }
    for (key, value) in &previous.extra {
        record.extra.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ai::testing::ScriptedProvider;
    use crate::workflow::query::{CodeLanguage, DocumentFormat, Query, QueryAction};
    use crate::workflow::services::testing::services;

    fn complex(target: GenerationTarget, identifier: Option<&str>) -> RequestState {
        let mut state = RequestState::new(Vec::new(), "write the thing");
        state.query = Query::Complex(ComplexQuery {
            content: "write the thing".to_string(),
            target,
            file_identifier: identifier.map(str::to_string),
            ..ComplexQuery::default()
        });
        state
    }

    #[tokio::test]
    async fn test_code_generation_persists_payload() {
        let provider = Arc::new(ScriptedProvider::new([
            "Here you go\n```py\nprint(1)\n```\nRun it with python.",
        ]));
        let (_dir, services) = services(provider.clone());
        let mut state = complex(GenerationTarget::Code(Some(CodeLanguage::Python)), Some("hello"));

        code_generator(&services, &mut state).await.unwrap();

        let output = state.context.generation.as_ref().unwrap();
        assert_eq!(output.payload, "print(1)");
        assert_eq!(output.explanation, "Here you go\n\nRun it with python.");
        assert!(!output.regenerated);
        assert!(output.saved_to.is_some());
        assert_eq!(provider.calls(), 1);

        let stored = services.store.content().retrieve("hello");
        assert_eq!(stored.content, "print(1)");
        assert_eq!(stored.metadata.code_language.as_deref(), Some("py"));
        assert_eq!(stored.metadata.query.as_deref(), Some("write the thing"));
    }

    #[tokio::test]
    async fn test_markdown_regenerates_once() {
        let provider = Arc::new(ScriptedProvider::new([
            "plain words only",
            "```md\n# Title\n\n- point\n```",
        ]));
        let (_dir, services) = services(provider.clone());
        let mut state =
            complex(GenerationTarget::Document(Some(DocumentFormat::Markdown)), Some("notes"));

        document_generator(&services, &mut state).await.unwrap();

        let output = state.context.generation.as_ref().unwrap();
        assert!(output.regenerated);
        assert_eq!(output.payload, "# Title\n\n- point");
        assert_eq!(provider.calls(), 2);
        assert!(provider.requests.lock()[1].human.starts_with("Improve this Markdown"));
        assert_eq!(services.store.content().retrieve("notes").content, "# Title\n\n- point");
    }

    #[tokio::test]
    async fn test_regeneration_accepted_even_if_invalid() {
        let provider = Arc::new(ScriptedProvider::new(["still plain", "plain again"]));
        let (_dir, services) = services(provider.clone());
        let mut state = complex(GenerationTarget::Document(Some(DocumentFormat::Markdown)), None);

        document_generator(&services, &mut state).await.unwrap();

        let output = state.context.generation.as_ref().unwrap();
        assert_eq!(output.payload, "plain again");
        assert!(output.saved_to.is_none());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_update_prompt_includes_previous_content() {
        let provider = Arc::new(ScriptedProvider::new(["```py\nprint(2)\n```"]));
        let (_dir, services) = services(provider.clone());
        let mut state = complex(GenerationTarget::Code(Some(CodeLanguage::Python)), Some("calc"));
        {
            let query = state.query.as_complex_mut().unwrap();
            query.action = QueryAction::Update;
            query.previous_content = Some("print(1)".to_string());
        }

        code_generator(&services, &mut state).await.unwrap();

        let request = provider.requests.lock()[0].clone();
        assert!(request.system.contains("You are updating an existing artifact"));
        assert!(request.human.contains("print(1)"));
        assert!(request.human.contains("Update request: write the thing"));
        assert_eq!(request.role, ModelRole::Code);
        assert!(state.context.generation.unwrap().metadata.is_update);
    }

    #[tokio::test]
    async fn test_missing_language_is_invalid_state() {
        let provider = Arc::new(ScriptedProvider::default());
        let (_dir, services) = services(provider.clone());
        let mut state = complex(GenerationTarget::Code(None), None);

        assert!(matches!(
            code_generator(&services, &mut state).await,
            Err(WorkflowError::InvalidState(_))
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_content_is_rejected() {
        let provider = Arc::new(ScriptedProvider::default());
        let (_dir, services) = services(provider);
        let mut state = complex(GenerationTarget::Document(Some(DocumentFormat::Text)), None);
        state.query.as_complex_mut().unwrap().content = "  ".to_string();

        assert!(matches!(
            document_generator(&services, &mut state).await,
            Err(WorkflowError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn test_document_with_inner_code_fence() {
        let reply = "# Setup\n\nRun:\n```bash\nmake\n```\nDone.";
        let provider = Arc::new(ScriptedProvider::new([reply]));
        let (_dir, services) = services(provider);
        let mut state = complex(GenerationTarget::Document(Some(DocumentFormat::Markdown)), None);

        document_generator(&services, &mut state).await.unwrap();
        assert_eq!(state.context.generation.unwrap().payload, reply);
    }
}
