//! Poem record and collection model
//!
//! A collection is persisted as one JSON array:
//!
//! ```json
//! [
//!   {
//!     "id": "1704067200000",
//!     "title": "A",
//!     "content": "x y z",
//!     "tags": ["love"],
//!     "lastUpdated": "2024-01-01T00:00:00.000Z"
//!   }
//! ]
//! ```
//!
//! Documents written by older site revisions may use numeric ids, omit
//! `tags`, or carry a `date` field instead of `lastUpdated`. All of those
//! still load, and any field this model does not know about is carried
//! through a rewrite unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::time::parse_timestamp;

/// Legacy timestamp field written by early revisions
const LEGACY_DATE_FIELD: &str = "date";

/// The full ordered set of poems, persisted as one document
pub type Collection = Vec<Poem>;

/// One poem entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poem {
    /// Immutable once created; unique within the collection
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    pub title: String,

    pub content: String,

    /// Order is irrelevant; duplicates are kept as-is
    #[serde(default)]
    pub tags: Vec<String>,

    /// Rewritten on every mutation
    #[serde(default)]
    pub last_updated: String,

    /// Fields this model does not interpret, preserved on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Poem {
    /// Create a poem with no timestamp yet
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            tags,
            last_updated: String::new(),
            extra: Map::new(),
        }
    }

    /// Builder-style timestamp setter
    pub fn with_last_updated(mut self, last_updated: impl Into<String>) -> Self {
        self.last_updated = last_updated.into();
        self
    }

    /// Timestamp used for display ordering
    ///
    /// Falls back to the legacy `date` field when `lastUpdated` is absent or
    /// unparseable.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.last_updated).or_else(|| {
            self.extra
                .get(LEGACY_DATE_FIELD)
                .and_then(Value::as_str)
                .and_then(parse_timestamp)
        })
    }

    /// The id as a number, when it is one
    pub fn numeric_id(&self) -> Option<i64> {
        self.id.parse().ok()
    }

    /// Exact, case-sensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Split a comma-separated tag field into tags
///
/// Entries are trimmed and empty entries dropped. Duplicates are kept.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join tags back into the comma-separated form used for editing
pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Signed(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}
