//! Resource revision documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type every `create_time` field must have.
pub const TIMESTAMP_TYPE: &str = "google.protobuf.Timestamp";

/// A concrete revision as stored or returned by an API.
///
/// Fields are optional because the checker reports their absence rather than
/// refusing the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceRevision {
    pub name: Option<String>,
    pub snapshot: Option<Value>,
    pub create_time: Option<String>,
    pub alternate_ids: Vec<String>,
}

impl ResourceRevision {
    /// Trailing `{id}` of a `.../revisions/{id}` name.
    pub fn revision_id(&self) -> Option<&str> {
        split_revision_name(self.name.as_deref()?).map(|(_, id)| id)
    }

    /// Parent resource name, i.e. the name with `/revisions/{id}` removed.
    pub fn parent(&self) -> Option<&str> {
        split_revision_name(self.name.as_deref()?).map(|(parent, _)| parent)
    }

    /// `create_time` when it is a valid RFC 3339 timestamp.
    pub fn parsed_create_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.create_time.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Split `parent/revisions/id` into (`parent`, `id`).
pub(crate) fn split_revision_name(name: &str) -> Option<(&str, &str)> {
    let (parent, id) = name.rsplit_once("/revisions/")?;
    if parent.is_empty() || id.is_empty() || id.contains('/') {
        return None;
    }
    Some((parent, id))
}

/// Structural description of a revision message type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionSchema {
    /// Fully-qualified revision message name.
    pub type_name: String,
    /// Fully-qualified parent resource message name.
    pub parent_type: String,
    /// Resource name pattern, e.g. `books/{book}/revisions/{revision}`.
    pub name_pattern: String,
    pub fields: Vec<FieldDescriptor>,
}

impl RevisionSchema {
    /// Field by name, with its index.
    pub fn field(&self, name: &str) -> Option<(usize, &FieldDescriptor)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_name: String,
    pub repeated: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            repeated: false,
        }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> ResourceRevision {
        ResourceRevision {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_revision_name_split() {
        let rev = named("publishers/p1/books/b1/revisions/r7");
        assert_eq!(rev.parent(), Some("publishers/p1/books/b1"));
        assert_eq!(rev.revision_id(), Some("r7"));
    }

    #[test]
    fn test_revision_name_without_suffix() {
        assert_eq!(named("publishers/p1/books/b1").revision_id(), None);
        assert_eq!(named("revisions/r7").parent(), None);
        assert_eq!(named("books/b1/revisions/").revision_id(), None);
        assert_eq!(named("books/b1/revisions/r1/extra").revision_id(), None);
    }

    #[test]
    fn test_parsed_create_time() {
        let mut rev = named("books/b1/revisions/r1");
        rev.create_time = Some("2024-03-01T12:00:00+02:00".to_string());
        let parsed = rev.parsed_create_time().unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T10:00:00+00:00");

        rev.create_time = Some("yesterday".to_string());
        assert!(rev.parsed_create_time().is_none());
    }
}
