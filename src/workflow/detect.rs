//! Update detection and artifact identifiers.
//!
//! An update request names an artifact generated earlier ("update the
//! sales_chart file to add totals"). Detection tries phrasing patterns first,
//! then asks the model, then falls back to the most recently used identifier.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::prompts;
use super::services::Services;
use crate::ai::CompletionRequest;

const VERBS: &str = r"update|modify|change|edit|revise|rewrite|fix|extend|improve|refactor";
const DETERMINERS: &str = r"(?:the\s+|my\s+|this\s+|that\s+|our\s+)?";
const NOUNS: &str = r"file|code|document|doc|script|program|module|report|function|class";

static UPDATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "update the sales_chart file"
        format!(r#"(?i)\b(?:{VERBS})\s+{DETERMINERS}["'`]?([\w.\-/]+)["'`]?\s+(?:{NOUNS})\b"#),
        // "update the file sales_chart.md"
        format!(r#"(?i)\b(?:{VERBS})\s+{DETERMINERS}(?:{NOUNS})\s+(?:named\s+|called\s+)?["'`]?([\w.\-/]+)"#),
        // "edit 'quarterly report'"
        format!(r#"(?i)\b(?:{VERBS})\s+["'`]([^"'`]+)["'`]"#),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid update pattern"))
    .collect()
});

/// Words a pattern may capture that never name an artifact.
const STOPWORDS: [&str; 18] = [
    "a", "an", "and", "it", "my", "our", "the", "this", "that", "to", "with", "code", "file",
    "document", "doc", "previous", "last", "existing",
];

/// Artifact nouns. A bare one is generic ("update the report to ..."); with an
/// extension, quotes, or in front of another noun it names the artifact.
const ARTIFACT_NOUNS: [&str; 6] = ["script", "program", "module", "report", "function", "class"];

/// Extensions dropped from identifiers; the store keys on the bare name.
const KNOWN_EXTENSIONS: [&str; 9] = ["py", "ts", "js", "cpp", "java", "md", "txt", "doc", "pdf"];

/// Where an update decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Pattern,
    Model,
    None,
}

/// Outcome of update detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDetection {
    pub is_update: bool,
    pub identifier: Option<String>,
    pub source: DetectionSource,
}

impl UpdateDetection {
    fn new_artifact() -> Self {
        Self { is_update: false, identifier: None, source: DetectionSource::None }
    }
}

#[derive(Debug, Deserialize)]
struct UpdateReply {
    #[serde(default)]
    is_update: bool,
    #[serde(default)]
    file_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentifierReply {
    #[serde(default)]
    file_identifier: Option<String>,
}

/// Match update phrasings.
///
/// `None` when no pattern matches; `Some(None)` when one matches but
/// captures no usable identifier ("update the code to ...").
pub fn match_update_pattern(text: &str) -> Option<Option<String>> {
    let mut matched = false;
    for (index, pattern) in UPDATE_PATTERNS.iter().enumerate() {
        // Only the "update the <noun> <name>" form captures in a generic position
        let named = index != 1;
        for caps in pattern.captures_iter(text) {
            matched = true;
            if let Some(identifier) = caps.get(1).and_then(|m| clean_candidate(m.as_str(), named))
            {
                return Some(Some(identifier));
            }
        }
    }
    matched.then_some(None)
}

/// Normalize a candidate identifier; `None` when nothing usable remains.
pub fn clean_identifier(raw: &str) -> Option<String> {
    clean_candidate(raw, false)
}

/// `named` marks a capture already in name position, so a bare artifact noun
/// is kept.
fn clean_candidate(raw: &str, named: bool) -> Option<String> {
    let quoted = raw.contains(['"', '\'', '`']);
    let trimmed = raw
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '`'))
        .trim_end_matches(|c: char| {
            c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '.' | ',' | ';' | ':' | '!' | '?')
        });

    let stem = strip_known_extension(trimmed);
    let lower = stem.to_lowercase();
    if stem.is_empty() || STOPWORDS.contains(&lower.as_str()) {
        return None;
    }
    let decorated = named || quoted || stem.len() != trimmed.len();
    if !decorated && ARTIFACT_NOUNS.contains(&lower.as_str()) {
        return None;
    }
    Some(stem.to_string())
}

fn strip_known_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && KNOWN_EXTENSIONS.contains(&ext.to_lowercase().as_str()) =>
        {
            stem
        }
        _ => name,
    }
}

/// Decide whether `text` revises an earlier artifact, and which one.
///
/// Never fails: a model error counts as "not an update".
pub async fn detect_update(services: &Services, text: &str) -> UpdateDetection {
    let (mut detection, model_candidate) = match match_update_pattern(text) {
        Some(Some(identifier)) => {
            tracing::debug!(identifier = %identifier, "Update detected by pattern");
            return UpdateDetection {
                is_update: true,
                identifier: Some(identifier),
                source: DetectionSource::Pattern,
            };
        }
        Some(None) => (
            UpdateDetection { is_update: true, identifier: None, source: DetectionSource::Pattern },
            None,
        ),
        None => {
            let request = CompletionRequest::json(prompts::UPDATE_DETECTION, text)
                .with_temperature(services.settings.main_temperature);
            match services.completion.complete_json::<UpdateReply>(&request).await {
                Ok(reply) if reply.is_update => (
                    UpdateDetection {
                        is_update: true,
                        identifier: None,
                        source: DetectionSource::Model,
                    },
                    reply.file_identifier,
                ),
                Ok(_) => return UpdateDetection::new_artifact(),
                Err(e) => {
                    tracing::warn!(error = %e, "Update detection failed, treating as new");
                    return UpdateDetection::new_artifact();
                }
            }
        }
    };

    let candidate = model_candidate.as_deref().and_then(|c| clean_candidate(c, true));
    detection.identifier = match candidate {
        Some(identifier) => Some(identifier),
        None => extract_identifier(services, text).await,
    };

    if detection.identifier.is_none() {
        detection.identifier = services.store.registry().last_identifier();
        if let Some(identifier) = &detection.identifier {
            tracing::info!(identifier = %identifier, "Using last identifier from registry");
        }
    }

    detection
}

/// Ask the model which artifact an update refers to.
async fn extract_identifier(services: &Services, text: &str) -> Option<String> {
    let recent = services.store.registry().recent();
    let human = if recent.is_empty() {
        text.to_string()
    } else {
        format!("Recently used identifiers: {}\n\nRequest: {}", recent.join(", "), text)
    };

    let request = CompletionRequest::json(prompts::IDENTIFIER_EXTRACTION, human)
        .with_temperature(services.settings.main_temperature);
    match services.completion.complete_json::<IdentifierReply>(&request).await {
        Ok(reply) => reply.file_identifier.as_deref().and_then(|c| clean_candidate(c, true)),
        Err(e) => {
            tracing::warn!(error = %e, "Identifier extraction failed");
            None
        }
    }
}

/// Derive an identifier for a new artifact.
///
/// Falls back to a timestamped name when the model gives nothing usable.
pub async fn generate_identifier(services: &Services, text: &str) -> String {
    let request = CompletionRequest::new(prompts::FILE_NAME, text)
        .with_temperature(services.settings.main_temperature);

    match services.completion.complete(&request).await {
        Ok(reply) => {
            if let Some(slug) = slugify(&reply, services.settings.slug_max_len) {
                return slug;
            }
            tracing::warn!(reply = %reply, "Unusable file name from model");
        }
        Err(e) => tracing::warn!(error = %e, "File name generation failed"),
    }

    fallback_identifier()
}

/// Turn a model reply into a filesystem-safe snake_case name.
pub fn slugify(raw: &str, max_len: usize) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*'));
    let line = strip_known_extension(line);

    let mut slug = String::with_capacity(line.len());
    for c in line.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }

    let slug: String = slug.trim_matches('_').chars().take(max_len).collect();
    let slug = slug.trim_end_matches('_');
    (!slug.is_empty()).then(|| slug.to_string())
}

/// Timestamped identifier with a random suffix.
pub fn fallback_identifier() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("artifact_{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &suffix[..8])
}
