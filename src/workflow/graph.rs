//! Stage graph and request entry point.
//!
//! Stages form a fixed DAG:
//!
//! ```text
//! query_type -> [web_search] -> [document_processing]
//!   simple  -> response
//!   complex -> content_retrieval -> generator_type
//!                -> language_classifier -> code_generator     -> response
//!                -> format_classifier   -> document_generator -> response
//! ```
//!
//! Routing is a pure function of the stage just finished and the request
//! state. A stage error never leaves the graph: it becomes a `false`
//! completion flag plus the context error.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::{WorkflowError, WorkflowResult};
use super::query::{GenerationTarget, Query};
use super::respond::FALLBACK_MESSAGE;
use super::services::{Services, StageSettings};
use super::state::{Message, RequestState};
use super::{classify, generate, research, respond, retrieve};
use crate::ai::CompletionClient;
use crate::core::Config;
use crate::integrations::HttpDocumentService;
use crate::store::Store;

/// Stage identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    QueryType,
    WebSearch,
    DocumentProcessing,
    ContentRetrieval,
    GeneratorType,
    LanguageClassifier,
    FormatClassifier,
    CodeGenerator,
    DocumentGenerator,
    Response,
}

impl StageId {
    /// First stage of every traversal.
    pub const ENTRY: Self = Self::QueryType;

    pub fn name(self) -> &'static str {
        match self {
            Self::QueryType => "query_type",
            Self::WebSearch => "web_search",
            Self::DocumentProcessing => "document_processing",
            Self::ContentRetrieval => "content_retrieval",
            Self::GeneratorType => "generator_type",
            Self::LanguageClassifier => "language_classifier",
            Self::FormatClassifier => "format_classifier",
            Self::CodeGenerator => "code_generator",
            Self::DocumentGenerator => "document_generator",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stage to run after `stage`, or `None` at the end of the graph.
pub fn next(stage: StageId, state: &RequestState) -> Option<StageId> {
    let next = match stage {
        StageId::QueryType if state.query.needs_web_search() => StageId::WebSearch,
        StageId::QueryType | StageId::WebSearch if state.query.needs_document_processing() => {
            StageId::DocumentProcessing
        }
        StageId::QueryType | StageId::WebSearch | StageId::DocumentProcessing => {
            match state.query {
                Query::Simple(_) => StageId::Response,
                Query::Complex(_) => StageId::ContentRetrieval,
            }
        }
        StageId::ContentRetrieval => StageId::GeneratorType,
        StageId::GeneratorType => match state.query.target() {
            GenerationTarget::Code(_) => StageId::LanguageClassifier,
            GenerationTarget::Document(_) => StageId::FormatClassifier,
            GenerationTarget::None => StageId::Response,
        },
        StageId::LanguageClassifier => match state.query.target() {
            GenerationTarget::Code(Some(_)) => StageId::CodeGenerator,
            _ => StageId::Response,
        },
        StageId::FormatClassifier => match state.query.target() {
            GenerationTarget::Document(Some(_)) => StageId::DocumentGenerator,
            _ => StageId::Response,
        },
        StageId::CodeGenerator | StageId::DocumentGenerator => StageId::Response,
        StageId::Response => return None,
    };
    Some(next)
}

/// Runs requests through the stages.
#[derive(Clone)]
pub struct StageGraph {
    services: Services,
}

impl StageGraph {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Traverse the graph from the entry stage to the end.
    pub async fn run(&self, state: &mut RequestState) {
        let mut stage = Some(StageId::ENTRY);

        while let Some(id) = stage {
            state.current_stage = Some(id);
            tracing::debug!(stage = %id, "Entering stage");

            let completed = match self.run_stage(id, state).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(stage = %id, error = %e, "Stage failed");
                    state.context.note_error(id, e.to_string());
                    false
                }
            };
            state.context.stage_status.insert(id, completed);

            stage = next(id, state);
        }

        state.current_stage = None;
    }

    async fn run_stage(&self, id: StageId, state: &mut RequestState) -> WorkflowResult<()> {
        let services = &self.services;
        match id {
            StageId::QueryType => classify::query_type(services, state).await,
            StageId::WebSearch => research::web_search(services, state).await,
            StageId::DocumentProcessing => research::document_processing(services, state).await,
            StageId::ContentRetrieval => retrieve::content_retrieval(services, state).await,
            StageId::GeneratorType => classify::generator_type(services, state).await,
            StageId::LanguageClassifier => classify::language(services, state).await,
            StageId::FormatClassifier => classify::format(services, state).await,
            StageId::CodeGenerator => generate::code_generator(services, state).await,
            StageId::DocumentGenerator => generate::document_generator(services, state).await,
            StageId::Response => respond::response(services, state).await,
        }
    }
}

/// One incoming chat turn.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,

    /// Earlier turns of the conversation
    pub prior: Vec<Message>,

    /// Uploaded document to take into account
    pub document_path: Option<PathBuf>,

    pub document_metadata: serde_json::Value,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    /// Attach earlier turns.
    pub fn with_prior(mut self, prior: Vec<Message>) -> Self {
        self.prior = prior;
        self
    }

    /// Attach an uploaded document.
    pub fn with_document(mut self, path: impl Into<PathBuf>, metadata: serde_json::Value) -> Self {
        self.document_path = Some(path.into());
        self.document_metadata = metadata;
        self
    }
}

/// What the caller gets back for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    /// Final assistant message
    pub message: String,

    /// Generated artifact, without explanation
    pub canvas: Option<String>,

    /// Language or format tag of the canvas
    pub target_format: Option<String>,

    /// Identifier the artifact was stored under
    pub file_identifier: Option<String>,

    /// Completion flag per visited stage
    pub stages: BTreeMap<StageId, bool>,

    pub error: Option<String>,
}

/// Entry point for the surrounding service layer.
#[derive(Clone)]
pub struct Orchestrator {
    graph: StageGraph,
}

impl Orchestrator {
    pub fn new(services: Services) -> Self {
        Self { graph: StageGraph::new(services) }
    }

    /// Build every collaborator from configuration.
    ///
    /// Fails when no completion provider is usable or the data directory
    /// cannot be opened.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let completion = CompletionClient::from_config(&config.ai).await?;
        let store = Store::open(config.data_dir()?, &config.store)?;
        let mut services =
            Services::new(completion, Arc::new(store), StageSettings::from_config(config));

        if let Some(documents) = HttpDocumentService::from_config(&config.documents)? {
            services = services.with_documents(Arc::new(documents));
        }

        Ok(Self::new(services))
    }

    pub fn services(&self) -> &Services {
        self.graph.services()
    }

    /// Run one request to completion.
    ///
    /// Always produces a message; failures show up in `stages` and `error`.
    pub async fn handle(&self, request: ChatRequest) -> WorkflowResponse {
        let mut state = RequestState::new(request.prior, request.message);
        state.context.document_path = request.document_path;
        state.context.document_metadata = request.document_metadata;

        let deadline = self.services().settings.request_timeout;
        if tokio::time::timeout(deadline, self.graph.run(&mut state)).await.is_err() {
            let stage = state.current_stage.take().unwrap_or(StageId::ENTRY);
            tracing::error!(stage = %stage, "Request deadline exceeded");
            state.context.stage_status.insert(stage, false);
            state.context.note_error(stage, WorkflowError::Timeout(deadline.as_secs()).to_string());
        }

        let message = state.final_message().unwrap_or(FALLBACK_MESSAGE).to_string();
        let context = state.context;
        let file_identifier = context
            .generation
            .as_ref()
            .filter(|g| g.saved_to.is_some())
            .and_then(|g| g.metadata.file_identifier.clone());

        WorkflowResponse {
            message,
            target_format: context.canvas.as_ref().and_then(|c| c.format.clone()),
            canvas: context.canvas.map(|c| c.content),
            file_identifier,
            stages: context.stage_status,
            error: context.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ai::testing::ScriptedProvider;
    use crate::workflow::query::{CodeLanguage, ComplexQuery, SimpleQuery};
    use crate::workflow::services::testing::services;

    fn simple(web: bool, docs: bool) -> RequestState {
        let mut state = RequestState::new(Vec::new(), "q");
        state.query = Query::Simple(SimpleQuery {
            content: "q".to_string(),
            needs_web_search: web,
            needs_document_processing: docs,
        });
        state
    }

    fn complex(target: GenerationTarget) -> RequestState {
        let mut state = RequestState::new(Vec::new(), "q");
        state.query =
            Query::Complex(ComplexQuery { content: "q".to_string(), target, ..ComplexQuery::default() });
        state
    }

    #[test]
    fn test_simple_routes() {
        assert_eq!(next(StageId::QueryType, &simple(false, false)), Some(StageId::Response));
        assert_eq!(next(StageId::QueryType, &simple(true, true)), Some(StageId::WebSearch));
        assert_eq!(next(StageId::WebSearch, &simple(true, true)), Some(StageId::DocumentProcessing));
        assert_eq!(next(StageId::QueryType, &simple(false, true)), Some(StageId::DocumentProcessing));
        assert_eq!(next(StageId::DocumentProcessing, &simple(false, true)), Some(StageId::Response));
        assert_eq!(next(StageId::Response, &simple(false, false)), None);
    }

    #[test]
    fn test_complex_routes() {
        let unset = complex(GenerationTarget::None);
        assert_eq!(next(StageId::QueryType, &unset), Some(StageId::ContentRetrieval));
        assert_eq!(next(StageId::ContentRetrieval, &unset), Some(StageId::GeneratorType));
        assert_eq!(next(StageId::GeneratorType, &unset), Some(StageId::Response));

        let code = complex(GenerationTarget::Code(None));
        assert_eq!(next(StageId::GeneratorType, &code), Some(StageId::LanguageClassifier));
        assert_eq!(next(StageId::LanguageClassifier, &code), Some(StageId::Response));

        let python = complex(GenerationTarget::Code(Some(CodeLanguage::Python)));
        assert_eq!(next(StageId::LanguageClassifier, &python), Some(StageId::CodeGenerator));
        assert_eq!(next(StageId::CodeGenerator, &python), Some(StageId::Response));

        let document = complex(GenerationTarget::Document(None));
        assert_eq!(next(StageId::GeneratorType, &document), Some(StageId::FormatClassifier));
    }

    #[test]
    fn test_stage_id_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&StageId::LanguageClassifier).unwrap(), "\"language_classifier\"");
        assert_eq!(StageId::DocumentGenerator.to_string(), "document_generator");
    }

    #[tokio::test]
    async fn test_simple_request() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"is_update": false}"#,
            r#"{"type": "simple", "needs_web_search": false, "needs_document_processing": false}"#,
            "Hello!",
        ]));
        let (_dir, services) = services(provider.clone());
        let orchestrator = Orchestrator::new(services);

        let response = orchestrator.handle(ChatRequest::new("hi")).await;

        assert_eq!(response.message, "Hello!");
        assert_eq!(response.canvas, None);
        assert_eq!(response.error, None);
        assert_eq!(
            response.stages,
            BTreeMap::from([(StageId::QueryType, true), (StageId::Response, true)])
        );
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_every_failure_still_answers() {
        let (_dir, services) = services(Arc::new(ScriptedProvider::default()));
        let orchestrator = Orchestrator::new(services);

        let response = orchestrator.handle(ChatRequest::new("hi")).await;

        assert_eq!(response.message, FALLBACK_MESSAGE);
        assert_eq!(response.stages.get(&StageId::QueryType), Some(&false));
        assert_eq!(response.stages.get(&StageId::Response), Some(&false));
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_deadline_produces_fallback() {
        let (_dir, mut services) = services(Arc::new(ScriptedProvider::default()));
        services.settings.request_timeout = Duration::ZERO;
        let orchestrator = Orchestrator::new(services);

        let response = orchestrator.handle(ChatRequest::new("hi")).await;

        assert_eq!(response.message, FALLBACK_MESSAGE);
        assert_eq!(response.error.as_deref(), Some("Request timed out after 0s"));
    }
}
