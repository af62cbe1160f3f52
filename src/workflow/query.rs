//! Classified request types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A tag that does not name a known language, format or generator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: {tag:?}")]
pub struct UnknownTag {
    kind: &'static str,
    tag: String,
}

impl UnknownTag {
    fn new(kind: &'static str, tag: &str) -> Self {
        Self { kind, tag: tag.to_string() }
    }
}

/// Supported programming languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeLanguage {
    #[serde(rename = "py")]
    Python,
    #[serde(rename = "ts")]
    TypeScript,
    #[serde(rename = "js")]
    JavaScript,
    #[serde(rename = "cpp")]
    Cpp,
    #[serde(rename = "java")]
    Java,
}

impl CodeLanguage {
    pub const ALL: [Self; 5] =
        [Self::Python, Self::TypeScript, Self::JavaScript, Self::Cpp, Self::Java];

    /// Short tag, also used as file extension.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::TypeScript => "ts",
            Self::JavaScript => "js",
            Self::Cpp => "cpp",
            Self::Java => "java",
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::TypeScript => "TypeScript",
            Self::JavaScript => "JavaScript",
            Self::Cpp => "C++",
            Self::Java => "Java",
        }
    }
}

impl FromStr for CodeLanguage {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "py" | "python" | "python3" => Ok(Self::Python),
            "ts" | "typescript" | "tsx" => Ok(Self::TypeScript),
            "js" | "javascript" | "jsx" | "node" => Ok(Self::JavaScript),
            "cpp" | "c++" | "cplusplus" | "cxx" => Ok(Self::Cpp),
            "java" => Ok(Self::Java),
            _ => Err(UnknownTag::new("language", s)),
        }
    }
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    #[serde(rename = "txt")]
    Text,
    #[serde(rename = "md")]
    Markdown,
    #[serde(rename = "doc")]
    Doc,
    #[serde(rename = "pdf")]
    Pdf,
}

impl DocumentFormat {
    pub const ALL: [Self; 4] = [Self::Text, Self::Markdown, Self::Doc, Self::Pdf];

    /// Short tag, also used as file extension.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Markdown => "md",
            Self::Doc => "doc",
            Self::Pdf => "pdf",
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "plain text",
            Self::Markdown => "Markdown",
            Self::Doc => "Word document",
            Self::Pdf => "PDF",
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "txt" | "text" | "plain" | "plaintext" => Ok(Self::Text),
            "md" | "markdown" => Ok(Self::Markdown),
            "doc" | "docx" | "word" => Ok(Self::Doc),
            "pdf" => Ok(Self::Pdf),
            _ => Err(UnknownTag::new("format", s)),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Kind of artifact a complex query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Code,
    Document,
    #[default]
    None,
}

impl GeneratorKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Document => "document",
            Self::None => "none",
        }
    }
}

impl FromStr for GeneratorKind {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "code" => Ok(Self::Code),
            "document" | "doc" | "documentation" => Ok(Self::Document),
            "none" | "" => Ok(Self::None),
            _ => Err(UnknownTag::new("generator type", s)),
        }
    }
}

/// What a complex query generates.
///
/// A language only exists on code targets and a format only on document
/// targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "generator_type", content = "tag", rename_all = "lowercase")]
pub enum GenerationTarget {
    /// Not classified yet
    #[default]
    None,
    Code(Option<CodeLanguage>),
    Document(Option<DocumentFormat>),
}

impl GenerationTarget {
    /// Target for a generator kind with no language or format yet.
    pub fn for_kind(kind: GeneratorKind) -> Self {
        match kind {
            GeneratorKind::Code => Self::Code(None),
            GeneratorKind::Document => Self::Document(None),
            GeneratorKind::None => Self::None,
        }
    }

    pub fn kind(self) -> GeneratorKind {
        match self {
            Self::None => GeneratorKind::None,
            Self::Code(_) => GeneratorKind::Code,
            Self::Document(_) => GeneratorKind::Document,
        }
    }

    pub fn language(self) -> Option<CodeLanguage> {
        match self {
            Self::Code(language) => language,
            _ => None,
        }
    }

    pub fn format(self) -> Option<DocumentFormat> {
        match self {
            Self::Document(format) => format,
            _ => None,
        }
    }

    /// Language or format tag, when resolved.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Code(language) => language.map(CodeLanguage::tag),
            Self::Document(format) => format.map(DocumentFormat::tag),
        }
    }

    /// Whether both the kind and its language or format are known.
    pub fn is_resolved(self) -> bool {
        self.tag().is_some()
    }
}

/// Whether a complex query creates a new artifact or revises one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryAction {
    #[default]
    New,
    Update,
}

/// A request answered directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleQuery {
    pub content: String,
    pub needs_web_search: bool,
    pub needs_document_processing: bool,
}

/// A request that generates code or a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexQuery {
    pub content: String,
    pub needs_web_search: bool,
    pub needs_document_processing: bool,
    pub target: GenerationTarget,
    pub action: QueryAction,

    /// Artifact to create or revise
    pub file_identifier: Option<String>,

    /// Current body of the artifact being revised
    pub previous_content: Option<String>,
}

impl ComplexQuery {
    /// Whether this revises an artifact whose body was found.
    pub fn is_resolved_update(&self) -> bool {
        self.action == QueryAction::Update
            && self.previous_content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// A classified request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Query {
    Simple(SimpleQuery),
    Complex(ComplexQuery),
}

impl Query {
    /// Unclassified request: simple, no side tasks.
    pub fn initial(content: impl Into<String>) -> Self {
        Self::Simple(SimpleQuery { content: content.into(), ..SimpleQuery::default() })
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Simple(q) => &q.content,
            Self::Complex(q) => &q.content,
        }
    }

    pub fn needs_web_search(&self) -> bool {
        match self {
            Self::Simple(q) => q.needs_web_search,
            Self::Complex(q) => q.needs_web_search,
        }
    }

    pub fn needs_document_processing(&self) -> bool {
        match self {
            Self::Simple(q) => q.needs_document_processing,
            Self::Complex(q) => q.needs_document_processing,
        }
    }

    pub fn as_complex(&self) -> Option<&ComplexQuery> {
        match self {
            Self::Complex(q) => Some(q),
            Self::Simple(_) => None,
        }
    }

    pub fn as_complex_mut(&mut self) -> Option<&mut ComplexQuery> {
        match self {
            Self::Complex(q) => Some(q),
            Self::Simple(_) => None,
        }
    }

    /// Generation target, `None` for simple queries.
    pub fn target(&self) -> GenerationTarget {
        self.as_complex().map(|q| q.target).unwrap_or_default()
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::initial("")
    }
}
