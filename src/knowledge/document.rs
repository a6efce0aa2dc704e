//! Document - extracted article model
//!
//! An extracted magazine article: text content plus a flat metadata map.
//! Metadata values are always scalars; anything else is coerced to text
//! when the document is read.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder stored for absent metadata values
pub const UNKNOWN: &str = "Unknown";

/// Fallback title for documents missing a `title` key
pub const UNTITLED: &str = "Untitled";

// ============================================================================
// MetaValue
// ============================================================================

/// Scalar metadata value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetaValue {
    /// Converts an arbitrary JSON value into a scalar.
    ///
    /// `null` becomes `"Unknown"`, arrays and objects become their JSON text.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => MetaValue::Text(UNKNOWN.to_string()),
            Value::Bool(b) => MetaValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => MetaValue::Int(i),
                None => MetaValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => MetaValue::Text(s),
            other => MetaValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(b) => write!(f, "{}", b),
            MetaValue::Int(i) => write!(f, "{}", i),
            MetaValue::Float(x) => write!(f, "{}", x),
            MetaValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        MetaValue::Int(i)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

pub type Metadata = BTreeMap<String, MetaValue>;

/// Cleans a raw JSON metadata object into scalar-only metadata
pub fn clean_metadata(raw: serde_json::Map<String, Value>) -> Metadata {
    raw.into_iter()
        .map(|(key, value)| (key, MetaValue::from_json(value)))
        .collect()
}

// ============================================================================
// Document
// ============================================================================

/// A retrievable article
///
/// Serialized with `page_content` as the content field so knowledge base
/// files stay interchangeable with other tooling; `content` is accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocument")]
pub struct Document {
    #[serde(rename = "page_content")]
    pub content: String,
    pub metadata: Metadata,
}

/// On-disk shape before metadata cleaning
#[derive(Deserialize)]
struct RawDocument {
    #[serde(alias = "content")]
    page_content: String,
    #[serde(default)]
    metadata: serde_json::Map<String, Value>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        Self {
            content: raw.page_content,
            metadata: clean_metadata(raw.metadata),
        }
    }
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builder-style metadata setter
    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Metadata value rendered as text
    pub fn meta_text(&self, key: &str) -> Option<String> {
        self.metadata.get(key).map(|v| v.to_string())
    }

    pub fn title(&self) -> String {
        self.meta_text("title").unwrap_or_else(|| UNTITLED.to_string())
    }

    pub fn source(&self) -> String {
        self.meta_text("source").unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// Store identity: `"{source}-{title}"`
    ///
    /// Two documents with the same key are the same logical article; later
    /// writes replace earlier ones in the knowledge base.
    pub fn key(&self) -> String {
        format!("{}-{}", self.source(), self.title())
    }

    /// Dedup identity: exact content plus the rendered metadata map.
    ///
    /// Stricter than [`Document::key`]: same source/title with different
    /// extracted content are distinct here.
    pub fn dedup_identity(&self) -> (String, String) {
        (self.content.clone(), format!("{:?}", self.metadata))
    }

    /// All metadata values joined by a single space
    pub fn metadata_text(&self) -> String {
        self.metadata
            .values()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Tests
// ============================================================================
