//! Decoding JSON documents into checked types.
//!
//! Anything that cannot be decoded is `Error::MalformedInput`. Values that
//! decode but break a rule (an empty domain, a snapshot that is not an
//! object) are left for the validators.

use crate::model::{
    Detail, DetailType, ErrorInfo, Help, LocalizedMessage, ResourceRevision, RevisionSchema,
    StatusPayload,
};
use crate::path::FieldPath;
use aipcheck_common_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Parse a status payload, either bare or wrapped in `{"error": {...}}`.
///
/// Returns the payload and the path of the status object within the input.
pub fn parse_status_document(value: &Value) -> Result<(StatusPayload, FieldPath)> {
    let root = FieldPath::root();
    let obj = as_object(value, &root)?;

    match obj.get("error") {
        Some(inner) if !obj.contains_key("code") => {
            let base = root.field("error");
            Ok((parse_status(inner, &base)?, base))
        }
        _ => Ok((parse_status(value, &root)?, root)),
    }
}

/// Parse a status object located at `base`.
pub fn parse_status(value: &Value, base: &FieldPath) -> Result<StatusPayload> {
    let obj = as_object(value, base)?;

    let code_path = base.field("code");
    let code = match obj.get("code") {
        None => return Err(Error::malformed(code_path, "`code` is required")),
        Some(v) => v
            .as_i64()
            .ok_or_else(|| Error::malformed(code_path, "`code` must be an integer"))?,
    };

    let status = optional_string(obj, "status", base)?;
    let message = optional_string(obj, "message", base)?.unwrap_or_default();

    let details_path = base.field("details");
    let details = match obj.get("details") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_detail(item, &details_path.index(i)))
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(Error::malformed(details_path, "`details` must be an array")),
    };

    Ok(StatusPayload {
        code,
        status,
        message,
        details,
    })
}

fn parse_detail(value: &Value, path: &FieldPath) -> Result<Detail> {
    let obj = as_object(value, path)?;
    let type_url = optional_string(obj, "@type", path)?
        .ok_or_else(|| Error::malformed(path.field("@type"), "detail is missing `@type`"))?;

    Ok(match DetailType::from_type_url(&type_url) {
        DetailType::ErrorInfo => Detail::ErrorInfo(decode::<ErrorInfo>(value, path)?),
        DetailType::LocalizedMessage => {
            Detail::LocalizedMessage(decode::<LocalizedMessage>(value, path)?)
        }
        DetailType::Help => Detail::Help(decode::<Help>(value, path)?),
        other => Detail::Opaque(other),
    })
}

/// Parse a single revision instance located at `base`.
pub fn parse_revision(value: &Value, base: &FieldPath) -> Result<ResourceRevision> {
    let obj = as_object(value, base)?;

    let alternate_ids = match first_of(obj, &["alternate_ids", "alternateIds"]) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    Error::malformed(
                        base.field("alternate_ids").index(i),
                        "alternate id must be a string",
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => {
            return Err(Error::malformed(
                base.field("alternate_ids"),
                "`alternate_ids` must be an array",
            ))
        }
    };

    let create_time = match first_of(obj, &["create_time", "createTime"]) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(Error::malformed(
                base.field("create_time"),
                "`create_time` must be a string",
            ))
        }
    };

    Ok(ResourceRevision {
        name: optional_string(obj, "name", base)?,
        snapshot: obj.get("snapshot").filter(|v| !v.is_null()).cloned(),
        create_time,
        alternate_ids,
    })
}

/// Parse a list of revisions; element paths are `[i]`.
pub fn parse_revision_list(value: &Value) -> Result<Vec<ResourceRevision>> {
    let root = FieldPath::root();
    let items = value
        .as_array()
        .ok_or_else(|| Error::malformed(root.as_str(), "expected an array of revisions"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_revision(item, &root.index(i)))
        .collect()
}

/// Parse a revision schema description.
pub fn parse_revision_schema(value: &Value) -> Result<RevisionSchema> {
    let root = FieldPath::root();
    as_object(value, &root)?;
    decode(value, &root)
}

fn decode<T: DeserializeOwned>(value: &Value, path: &FieldPath) -> Result<T> {
    T::deserialize(value).map_err(|e| Error::malformed(path.as_str(), e.to_string()))
}

fn as_object<'a>(value: &'a Value, path: &FieldPath) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::malformed(path.as_str(), "expected a JSON object"))
}

fn first_of<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn optional_string(obj: &Map<String, Value>, key: &str, base: &FieldPath) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::malformed(
            base.field(key),
            format!("`{key}` must be a string"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_and_enveloped_status() {
        let bare = json!({ "code": 404, "message": "no such book" });
        let (status, base) = parse_status_document(&bare).unwrap();
        assert!(base.is_root());
        assert_eq!(status.code, 404);
        assert_eq!(status.message, "no such book");
        assert!(status.details.is_empty());

        let wrapped = json!({ "error": bare });
        let (status, base) = parse_status_document(&wrapped).unwrap();
        assert_eq!(base.as_str(), "error");
        assert_eq!(status.code, 404);
    }

    #[test]
    fn test_details_are_typed() {
        let doc = json!({
            "code": 400,
            "details": [
                { "@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "BAD", "domain": "x.com",
                  "metadata": { "field": "title" } },
                { "@type": "type.googleapis.com/google.rpc.BadRequest", "fieldViolations": [] },
            ]
        });
        let (status, _) = parse_status_document(&doc).unwrap();
        match &status.details[0] {
            Detail::ErrorInfo(info) => {
                assert_eq!(info.reason, "BAD");
                assert_eq!(info.metadata["field"], "title");
            }
            other => panic!("expected ErrorInfo, got {other:?}"),
        }
        assert_eq!(status.details[1], Detail::Opaque(DetailType::BadRequest));
    }

    #[test]
    fn test_missing_code_is_malformed() {
        let err = parse_status_document(&json!({ "error": { "message": "x" } })).unwrap_err();
        match err {
            Error::MalformedInput { path, .. } => assert_eq!(path, "error.code"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_detail_without_type_is_malformed() {
        let err = parse_status_document(&json!({ "code": 500, "details": [{ "reason": "X" }] }))
            .unwrap_err();
        match err {
            Error::MalformedInput { path, .. } => assert_eq!(path, "details[0].@type"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let doc = json!({ "code": 400, "details": [
            { "@type": "google.rpc.ErrorInfo", "reason": "BAD_THING", "domain": "x.com", "metadata": null },
            { "@type": "google.rpc.Help", "links": null },
        ]});
        let (status, _) = parse_status_document(&doc).unwrap();
        match &status.details[0] {
            Detail::ErrorInfo(info) => assert!(info.metadata.is_empty()),
            other => panic!("expected ErrorInfo, got {other:?}"),
        }
        assert_eq!(status.details[1], Detail::Help(Help::default()));
    }

    #[test]
    fn test_non_string_metadata_is_malformed() {
        let doc = json!({ "code": 500, "details": [
            { "@type": "google.rpc.ErrorInfo", "reason": "X_Y", "metadata": { "n": 3 } }
        ]});
        let err = parse_status_document(&doc).unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_revision_accepts_camel_case_fields() {
        let doc = json!({
            "name": "books/b1/revisions/r1",
            "snapshot": {},
            "createTime": "2024-01-01T00:00:00Z",
            "alternateIds": ["stable"],
        });
        let rev = parse_revision(&doc, &FieldPath::root()).unwrap();
        assert_eq!(rev.create_time.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(rev.alternate_ids, vec!["stable".to_string()]);
    }

    #[test]
    fn test_revision_list_requires_array() {
        assert!(parse_revision_list(&json!({})).unwrap_err().is_malformed_input());
        let err = parse_revision_list(&json!([{ "name": 7 }])).unwrap_err();
        match err {
            Error::MalformedInput { path, .. } => assert_eq!(path, "[0].name"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_schema_decodes_fields() {
        let doc = json!({
            "type_name": "library.BookRevision",
            "parent_type": "library.Book",
            "fields": [{ "name": "alternate_ids", "type_name": "string", "repeated": true }],
        });
        let schema = parse_revision_schema(&doc).unwrap();
        assert!(schema.field("alternate_ids").unwrap().1.repeated);
        assert!(parse_revision_schema(&json!([1])).is_err());
    }
}
