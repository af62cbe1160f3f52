//! Persisted content records and their metadata.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A generated artifact with metadata accumulated across updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentRecord {
    /// The artifact body
    pub content: String,

    /// Generation metadata
    pub metadata: RecordMetadata,
}

impl ContentRecord {
    /// Create a record.
    pub fn new(content: impl Into<String>, metadata: RecordMetadata) -> Self {
        Self { content: content.into(), metadata }
    }

    /// Whether the lookup found nothing usable.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Metadata stored alongside a record.
///
/// Target fields are kept as plain tags so that records written by older
/// versions, or with unknown languages, stay readable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordMetadata {
    /// First time the identifier was generated; never changes afterwards
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,

    /// Last time the record was written
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub timestamp: Option<DateTime<Utc>>,

    /// Request text that produced this revision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Every distinct request text applied to this identifier, oldest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query_history: Vec<String>,

    /// `code` or `document`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_update: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_identifier: Option<String>,

    /// Fields this version does not model; carried forward untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RecordMetadata {
    /// Metadata inferred from a legacy file extension.
    pub fn from_extension(ext: &str) -> Self {
        let (generator_type, code_language, document_format) = match ext {
            "py" | "ts" | "js" | "cpp" | "java" => ("code", Some(ext), None),
            "md" | "txt" => ("document", None, Some(ext)),
            _ => return Self::default(),
        };

        Self {
            generator_type: Some(generator_type.to_string()),
            code_language: code_language.map(str::to_string),
            document_format: document_format.map(str::to_string),
            ..Self::default()
        }
    }

    /// Prepare metadata for a first write.
    pub(crate) fn stamp_new(&mut self, now: DateTime<Utc>) {
        self.created_at = Some(self.timestamp.unwrap_or(now));
        self.push_query();
        self.timestamp = Some(now);
    }

    /// Merge with the metadata of the revision being replaced.
    ///
    /// `created_at` comes from the prior revision (or its timestamp), the
    /// query history is extended without duplicates, and fields missing here
    /// are taken from the prior revision. `timestamp` is always refreshed.
    pub(crate) fn stamp_update(&mut self, prior: &RecordMetadata, now: DateTime<Utc>) {
        self.created_at = prior
            .created_at
            .or(prior.timestamp)
            .or(self.timestamp)
            .or(Some(now));

        let mut history = prior.query_history.clone();
        for query in self.query_history.drain(..) {
            if !history.contains(&query) {
                history.push(query);
            }
        }
        self.query_history = history;
        self.push_query();

        carry(&mut self.generator_type, &prior.generator_type);
        carry(&mut self.code_language, &prior.code_language);
        carry(&mut self.document_format, &prior.document_format);
        carry(&mut self.is_update, &prior.is_update);
        carry(&mut self.file_identifier, &prior.file_identifier);
        for (key, value) in &prior.extra {
            self.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }

        self.timestamp = Some(now);
    }

    fn push_query(&mut self) {
        if let Some(query) = self.query.as_ref().filter(|q| !q.is_empty()) {
            if !self.query_history.contains(query) {
                self.query_history.push(query.clone());
            }
        }
    }
}

fn carry<T: Clone>(field: &mut Option<T>, prior: &Option<T>) {
    if field.is_none() {
        field.clone_from(prior);
    }
}

/// Accept RFC 3339 strings as well as epoch seconds written by older stores.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(DateTime<Utc>),
        Epoch(f64),
        Other(serde_json::Value),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(ts)) => Some(ts),
        Some(Raw::Epoch(secs)) => {
            let nanos = (secs.fract() * 1e9) as u32;
            Utc.timestamp_opt(secs.trunc() as i64, nanos).single()
        }
        Some(Raw::Other(_)) | None => None,
    })
}
