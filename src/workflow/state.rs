//! Per-request state threaded through the stage graph.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::graph::StageId;
use super::query::{CodeLanguage, DocumentFormat, GeneratorKind, Query};
use crate::integrations::{RelevantDocument, WebSearchResults};
use crate::store::RecordMetadata;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Labels attached to a generation and persisted with the artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub generator_type: GeneratorKind,
    pub code_language: Option<CodeLanguage>,
    pub document_format: Option<DocumentFormat>,
    pub is_update: bool,
    pub file_identifier: Option<String>,
}

impl GenerationMetadata {
    /// Store metadata for this generation.
    pub fn to_record(&self, query: &str) -> RecordMetadata {
        RecordMetadata {
            query: Some(query.to_string()),
            generator_type: Some(self.generator_type.tag().to_string()),
            code_language: self.code_language.map(|l| l.tag().to_string()),
            document_format: self.document_format.map(|f| f.tag().to_string()),
            is_update: Some(self.is_update),
            file_identifier: self.file_identifier.clone(),
            ..RecordMetadata::default()
        }
    }
}

/// Output of a generator stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Final model reply, fences and prose included
    pub raw_response: String,

    /// The artifact alone
    pub payload: String,

    /// Prose around the artifact
    pub explanation: String,

    /// Whether a stricter second attempt replaced the first reply
    pub regenerated: bool,

    pub metadata: GenerationMetadata,

    /// Where the artifact was persisted, if it was
    pub saved_to: Option<PathBuf>,
}

/// Artifact shown to the user next to the answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub content: String,

    /// Language or format tag, used as file extension
    pub format: Option<String>,
}

/// Named artifacts produced by the stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageContext {
    /// Uploaded document to process
    pub document_path: Option<PathBuf>,

    /// Metadata sent along with the document
    pub document_metadata: serde_json::Value,

    pub web_search: Option<WebSearchResults>,

    /// Status message from document processing
    pub processing_result: Option<String>,

    /// Chunks found by semantic search
    pub relevant_documents: Vec<RelevantDocument>,

    /// Metadata of the artifact being revised
    pub previous_metadata: Option<RecordMetadata>,

    pub generation: Option<GenerationOutput>,

    pub canvas: Option<Canvas>,

    /// Completion flag per visited stage
    pub stage_status: BTreeMap<StageId, bool>,

    /// Most recent stage error
    pub error: Option<String>,
}

impl StageContext {
    /// Record an error without failing the stage.
    pub fn note_error(&mut self, stage: StageId, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = ?stage, error = %message, "Stage error recorded");
        self.error = Some(message);
    }

    /// Completion flag for a stage; `None` when it was not visited.
    pub fn completed(&self, stage: StageId) -> Option<bool> {
        self.stage_status.get(&stage).copied()
    }
}

/// State of one request through the graph.
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    pub messages: Vec<Message>,

    /// Stage currently executing
    pub current_stage: Option<StageId>,

    /// Side tasks requested by classification
    pub task_flags: BTreeMap<String, bool>,

    pub context: StageContext,

    pub query: Query,
}

impl RequestState {
    /// Start a request from prior turns plus the new user message.
    pub fn new(prior: Vec<Message>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut messages = prior;
        messages.push(Message::user(message.clone()));

        Self { messages, query: Query::initial(message), ..Self::default() }
    }

    /// Text of the latest user message.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages.iter().rev().find(|m| m.role == Role::User).map(|m| m.content.as_str())
    }

    /// Text of the final assistant message.
    pub fn final_message(&self) -> Option<&str> {
        self.messages.last().filter(|m| m.role == Role::Assistant).map(|m| m.content.as_str())
    }

    pub fn set_flag(&mut self, name: &str, value: bool) {
        self.task_flags.insert(name.to_string(), value);
    }
}
