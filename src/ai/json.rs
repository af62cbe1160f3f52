//! Decoding of JSON-returning prompts.
//!
//! Models often wrap JSON in a markdown fence or add a sentence around it, so
//! the reply is narrowed to its outermost object before decoding.

use serde::de::DeserializeOwned;

use super::AIError;

/// Decode a model reply that is expected to contain a JSON object.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T, AIError> {
    let candidate = json_object_span(reply).unwrap_or(reply).trim();
    serde_json::from_str(candidate).map_err(|e| AIError::InvalidJson(format!("{e}: {reply}")))
}

fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Kind {
        generator_type: String,
    }

    #[test]
    fn test_plain_object() {
        let kind: Kind = parse_json_reply(r#"{"generator_type": "code"}"#).unwrap();
        assert_eq!(kind.generator_type, "code");
    }

    #[test]
    fn test_fenced_object() {
        let kind: Kind =
            parse_json_reply("```json\n{\"generator_type\": \"document\"}\n```").unwrap();
        assert_eq!(kind.generator_type, "document");
    }

    #[test]
    fn test_object_with_prose() {
        let kind: Kind =
            parse_json_reply("Sure! Here you go: {\"generator_type\": \"code\"} Hope it helps.")
                .unwrap();
        assert_eq!(kind.generator_type, "code");
    }

    #[test]
    fn test_malformed_reply() {
        let err = parse_json_reply::<Kind>("not json at all").unwrap_err();
        assert!(matches!(err, AIError::InvalidJson(_)));
    }
}
