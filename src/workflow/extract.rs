//! Separating a generated artifact from the prose around it.

use once_cell::sync::Lazy;
use regex::Regex;

const FENCE: &str = "```";

/// Language tags that may open a fence.
static FENCE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_+#.\-]*$").expect("valid fence tag pattern"));

/// Fence tags that wrap a whole document rather than a snippet inside one.
const DOCUMENT_TAGS: [&str; 8] = ["", "md", "markdown", "txt", "text", "plain", "doc", "pdf"];

/// A reply split into artifact and explanation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub payload: String,
    pub explanation: String,
}

/// Split a reply on its first fenced block.
///
/// The body of the first fence, minus a leading tag line, is the payload.
/// Text before it and everything after it (later fences included) is the
/// explanation. A reply without fences is all payload.
pub fn extract(reply: &str) -> Extracted {
    let parts: Vec<&str> = reply.split(FENCE).collect();
    if parts.len() < 2 {
        return Extracted { payload: reply.trim().to_string(), explanation: String::new() };
    }

    let body = strip_tag_line(parts[1]);
    let before = parts[0].trim();
    let after = parts[2..].join(FENCE);
    let after = after.trim();

    let explanation =
        [before, after].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join("\n\n");

    Extracted { payload: body.trim().to_string(), explanation }
}

/// Extraction for documents.
///
/// A document may itself contain code fences; the fence rule only applies
/// when the first fence wraps the document as a whole.
pub fn extract_document(reply: &str) -> Extracted {
    match first_fence_tag(reply) {
        Some(tag) if !DOCUMENT_TAGS.contains(&tag.to_lowercase().as_str()) => {
            Extracted { payload: reply.trim().to_string(), explanation: String::new() }
        }
        _ => extract(reply),
    }
}

fn first_fence_tag(reply: &str) -> Option<&str> {
    let start = reply.find(FENCE)? + FENCE.len();
    let line = reply[start..].lines().next().unwrap_or("").trim();
    FENCE_TAG.is_match(line).then_some(line)
}

fn strip_tag_line(body: &str) -> &str {
    match body.split_once('\n') {
        Some((first, rest)) if FENCE_TAG.is_match(first.trim()) => rest,
        _ => body,
    }
}
