//! Response stage.

use super::error::WorkflowResult;
use super::prompts;
use super::query::GeneratorKind;
use super::services::Services;
use super::state::{Canvas, Message, RequestState};
use crate::ai::CompletionRequest;

/// Reply appended when the final answer could not be produced.
pub const FALLBACK_MESSAGE: &str =
    "I ran into a problem while preparing the answer. Please try again.";

/// Response stage.
///
/// Puts the generated artifact on the canvas, then asks the model for the
/// final answer. On failure a fallback message is appended so the
/// conversation always ends with an assistant turn.
pub async fn response(services: &Services, state: &mut RequestState) -> WorkflowResult<()> {
    let target = state.query.target();

    if let Some(generation) = &state.context.generation {
        state.context.canvas = Some(Canvas {
            content: generation.payload.clone(),
            format: target.tag().map(str::to_string),
        });
    }

    let system = match target.kind() {
        GeneratorKind::Code => prompts::CODE_EXPLAINER,
        GeneratorKind::Document => prompts::DOCUMENT_EXPLAINER,
        GeneratorKind::None => prompts::GENERAL_ANSWER,
    };

    let request = CompletionRequest::new(system, summarize(state))
        .with_temperature(services.settings.main_temperature);

    match services.completion.complete(&request).await {
        Ok(answer) => {
            tracing::info!(kind = target.kind().tag(), "Response generated");
            state.messages.push(Message::assistant(answer.trim()));
            Ok(())
        }
        Err(e) => {
            state.messages.push(Message::assistant(FALLBACK_MESSAGE));
            Err(e.into())
        }
    }
}

/// Human turn: the query plus everything the earlier stages gathered.
fn summarize(state: &RequestState) -> String {
    let context = &state.context;
    let mut prompt = format!("Query: {}", state.query.content());

    if let Some(generation) = &context.generation {
        prompt.push_str(&format!(
            "\n\nGenerated content:\n```{}\n{}\n```",
            state.query.target().tag().unwrap_or(""),
            generation.payload
        ));
        if !generation.explanation.is_empty() {
            prompt.push_str(&format!("\n\nGenerator notes:\n{}", generation.explanation));
        }
        if generation.metadata.is_update {
            prompt.push_str("\n\nThis revised an existing artifact.");
        }
    }

    if let Some(status) = &context.processing_result {
        prompt.push_str(&format!("\n\nDocument processing: {status}"));
    }

    if !context.relevant_documents.is_empty() {
        prompt.push_str("\n\nRelevant document excerpts:");
        for doc in &context.relevant_documents {
            prompt.push_str(&format!("\n- {}", doc.content.trim()));
        }
    }

    if let Some(search) = &context.web_search {
        if search.results.is_empty() {
            prompt.push_str("\n\nWeb search returned no results.");
        } else {
            prompt.push_str("\n\nWeb search results:");
            for result in &search.results {
                prompt.push_str(&format!("\n- {result}"));
            }
        }
    }

    if let Some(error) = &context.error {
        prompt.push_str(&format!("\n\nNote: an earlier step failed: {error}"));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ai::testing::ScriptedProvider;
    use crate::workflow::query::{CodeLanguage, ComplexQuery, GenerationTarget, Query};
    use crate::workflow::services::testing::services;
    use crate::workflow::state::GenerationOutput;

    #[tokio::test]
    async fn test_simple_answer() {
        let provider = Arc::new(ScriptedProvider::new(["Paris."]));
        let (_dir, services) = services(provider.clone());
        let mut state = RequestState::new(Vec::new(), "capital of France?");

        response(&services, &mut state).await.unwrap();

        assert_eq!(state.final_message(), Some("Paris."));
        assert!(state.context.canvas.is_none());
        assert_eq!(provider.requests.lock()[0].system, prompts::GENERAL_ANSWER);
    }

    #[tokio::test]
    async fn test_canvas_holds_payload() {
        let provider = Arc::new(ScriptedProvider::new(["This prints one."]));
        let (_dir, services) = services(provider.clone());
        let mut state = RequestState::new(Vec::new(), "print one");
        state.query = Query::Complex(ComplexQuery {
            content: "print one".to_string(),
            target: GenerationTarget::Code(Some(CodeLanguage::Python)),
            ..ComplexQuery::default()
        });
        state.context.generation = Some(GenerationOutput {
            raw_response: "Sure\n```py\nprint(1)\n```".to_string(),
            payload: "print(1)".to_string(),
            explanation: "Sure".to_string(),
            ..GenerationOutput::default()
        });

        response(&services, &mut state).await.unwrap();

        let canvas = state.context.canvas.unwrap();
        assert_eq!(canvas.content, "print(1)");
        assert_eq!(canvas.format.as_deref(), Some("py"));
        let request = provider.requests.lock()[0].clone();
        assert_eq!(request.system, prompts::CODE_EXPLAINER);
        assert!(request.human.contains("print(1)"));
    }

    #[tokio::test]
    async fn test_failure_appends_fallback() {
        let (_dir, services) = services(Arc::new(ScriptedProvider::default()));
        let mut state = RequestState::new(Vec::new(), "hello");

        assert!(response(&services, &mut state).await.is_err());
        assert_eq!(state.final_message(), Some(FALLBACK_MESSAGE));
    }
}
