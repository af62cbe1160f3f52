//! Format checks run on generated artifacts.
//!
//! Each target has at most one validator. A failed check triggers a single
//! regeneration with the validator's stricter guidelines.

use once_cell::sync::Lazy;
use regex::Regex;

use super::query::{CodeLanguage, DocumentFormat, GenerationTarget};

/// A pattern that must be present (or absent) in the artifact.
struct Rule {
    pattern: Regex,
    required: bool,
    message: &'static str,
}

impl Rule {
    fn new(pattern: &str, required: bool, message: &'static str) -> Self {
        Self { pattern: Regex::new(pattern).expect("valid validator pattern"), required, message }
    }
}

static TYPESCRIPT_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(r"\bvar\b", false, "Avoid using 'var', prefer 'let' or 'const'"),
        Rule::new(r"function\s+\w+\s*\([^:)]*\)", false, "Functions should have type annotations"),
        Rule::new(r"(interface|type)\s+\w+", true, "Missing interface or type definition"),
        Rule::new(r":\s*[A-Z]\w+(\[\])?", true, "Missing type annotations"),
        Rule::new(
            r"React\.(FC|FunctionComponent)<",
            true,
            "React components should use TypeScript generics",
        ),
    ]
});

/// Validator attached to a generation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// Modern declarations and type annotations
    TypeScript,
    /// At least one heading, fence, link or list marker
    Markdown,
}

impl Validator {
    /// Validator for a target, if it has one.
    pub fn for_target(target: GenerationTarget) -> Option<Self> {
        match target {
            GenerationTarget::Code(Some(CodeLanguage::TypeScript)) => Some(Self::TypeScript),
            GenerationTarget::Document(Some(DocumentFormat::Markdown)) => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Problems found in `artifact`; empty when it passes.
    pub fn check(self, artifact: &str) -> Vec<&'static str> {
        if artifact.trim().is_empty() {
            return vec!["Artifact is empty"];
        }

        match self {
            Self::TypeScript => TYPESCRIPT_RULES
                .iter()
                .filter(|rule| rule.pattern.is_match(artifact) != rule.required)
                .map(|rule| rule.message)
                .collect(),
            Self::Markdown => {
                let has_markup = artifact.contains('#')
                    || artifact.contains("```")
                    || (artifact.contains('[') && artifact.contains(']'))
                    || artifact.contains("- ")
                    || artifact.contains("* ");
                if has_markup {
                    Vec::new()
                } else {
                    vec!["No Markdown structure (headings, code blocks, links or lists)"]
                }
            }
        }
    }

    /// Whether `artifact` passes.
    pub fn passes(self, artifact: &str) -> bool {
        self.check(artifact).is_empty()
    }

    /// What the regeneration prompt calls the artifact.
    pub fn subject(self) -> &'static str {
        match self {
            Self::TypeScript => "TypeScript code",
            Self::Markdown => "Markdown",
        }
    }

    /// System prompt for the regeneration attempt.
    pub fn strict_prompt(self) -> &'static str {
        match self {
            Self::TypeScript => concat!(
                "Improve this TypeScript code following best practices:\n",
                "1. Use strict type checking\n",
                "2. Follow Airbnb TypeScript style guide\n",
                "3. Include JSDoc comments\n",
                "4. Use async/await for asynchronous code\n",
                "5. Include error handling with try/catch\n",
            ),
            Self::Markdown => concat!(
                "Improve this Markdown following best practices:\n",
                "1. Use proper Markdown syntax for headings\n",
                "2. Include links and images with proper syntax\n",
                "3. Use code blocks for code snippets\n",
                "4. Include lists and tables with proper formatting\n",
                "5. Use blockquotes for citations\n",
            ),
        }
    }
}
