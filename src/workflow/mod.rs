//! Request workflow.
//!
//! A request flows through a fixed graph of stages sharing one
//! [`RequestState`]:
//!
//! - `query_type`: simple vs complex, side tasks, update detection
//! - `web_search` / `document_processing`: optional context gathering
//! - `content_retrieval`: loads the artifact an update refers to
//! - `generator_type`, `language_classifier`, `format_classifier`: pick the target
//! - `code_generator` / `document_generator`: produce, validate and store the artifact
//! - `response`: final answer plus the canvas payload
//!
//! [`Orchestrator::handle`] is the single entry point.

mod classify;
mod detect;
mod error;
mod extract;
mod generate;
mod graph;
mod prompts;
mod query;
mod research;
mod respond;
mod retrieve;
mod services;
mod state;
mod validate;

pub use detect::{clean_identifier, fallback_identifier, match_update_pattern, slugify};
pub use error::{WorkflowError, WorkflowResult};
pub use extract::{extract, extract_document, Extracted};
pub use graph::{next, ChatRequest, Orchestrator, StageGraph, StageId, WorkflowResponse};
pub use query::{
    CodeLanguage, ComplexQuery, DocumentFormat, GenerationTarget, GeneratorKind, Query,
    QueryAction, SimpleQuery, UnknownTag,
};
pub use respond::FALLBACK_MESSAGE;
pub use services::{Services, StageSettings};
pub use state::{
    Canvas, GenerationMetadata, GenerationOutput, Message, RequestState, Role, StageContext,
};
pub use validate::Validator;
