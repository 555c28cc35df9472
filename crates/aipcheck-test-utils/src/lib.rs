//! Test utilities for aipcheck crates.
//!
//! Fixtures are plain `serde_json::Value`s shaped like the documents the
//! checker consumes, so they exercise the same parsing path as real input.

use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tempfile::TempDir;

/// `@type` URL prefix for `google.rpc` detail payloads.
pub const RPC_TYPE_PREFIX: &str = "type.googleapis.com/google.rpc.";

/// Full `@type` URL for a `google.rpc` detail message name.
pub fn type_url(message: &str) -> String {
    format!("{RPC_TYPE_PREFIX}{message}")
}

/// An `ErrorInfo` detail.
pub fn error_info(reason: &str, domain: &str, metadata: &[(&str, &str)]) -> Value {
    let metadata: Map<String, Value> = metadata
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    json!({
        "@type": type_url("ErrorInfo"),
        "reason": reason,
        "domain": domain,
        "metadata": metadata,
    })
}

/// A `LocalizedMessage` detail.
pub fn localized_message(locale: &str, message: &str) -> Value {
    json!({
        "@type": type_url("LocalizedMessage"),
        "locale": locale,
        "message": message,
    })
}

/// A `Help` detail with the given (description, url) links.
pub fn help(links: &[(&str, &str)]) -> Value {
    let links: Vec<Value> = links
        .iter()
        .map(|(description, url)| json!({ "description": description, "url": url }))
        .collect();
    json!({ "@type": type_url("Help"), "links": links })
}

/// Any detail carrying only its `@type`.
pub fn bare_detail(message: &str) -> Value {
    json!({ "@type": type_url(message) })
}

/// Builder for status payload documents.
#[derive(Debug, Clone)]
pub struct StatusFixture {
    code: Value,
    status: Option<String>,
    message: Option<String>,
    details: Vec<Value>,
}

impl StatusFixture {
    /// Start from an HTTP code and canonical status name.
    pub fn new(code: i64, status: &str) -> Self {
        Self {
            code: json!(code),
            status: Some(status.to_string()),
            message: None,
            details: Vec::new(),
        }
    }

    /// Replace `code` with an arbitrary JSON value.
    pub fn raw_code(mut self, code: Value) -> Self {
        self.code = code;
        self
    }

    /// Drop the `status` name.
    pub fn without_status(mut self) -> Self {
        self.status = None;
        self
    }

    /// Set the developer-facing message.
    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Append a detail payload.
    pub fn detail(mut self, detail: Value) -> Self {
        self.details.push(detail);
        self
    }

    /// Bare status object.
    pub fn build(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("code".to_string(), self.code.clone());
        if let Some(status) = &self.status {
            doc.insert("status".to_string(), json!(status));
        }
        if let Some(message) = &self.message {
            doc.insert("message".to_string(), json!(message));
        }
        doc.insert("details".to_string(), Value::Array(self.details.clone()));
        Value::Object(doc)
    }

    /// Status wrapped in the HTTP/JSON `{"error": ...}` envelope.
    pub fn envelope(&self) -> Value {
        json!({ "error": self.build() })
    }
}

/// The quota example: a well-formed `RESOURCE_EXHAUSTED` payload.
pub fn resource_exhausted() -> StatusFixture {
    StatusFixture::new(429, "RESOURCE_EXHAUSTED").detail(error_info(
        "RESOURCE_AVAILABILITY",
        "compute.googleapis.com",
        &[("zone", "us-east1-a")],
    ))
}

/// A revision instance document.
pub fn revision(name: &str, create_time: &str, alternate_ids: &[&str]) -> Value {
    json!({
        "name": name,
        "snapshot": { "title": "The Hobbit" },
        "create_time": create_time,
        "alternate_ids": alternate_ids,
    })
}

/// A revision schema document with the usual fields.
pub fn revision_schema() -> Value {
    json!({
        "type_name": "library.BookRevision",
        "parent_type": "library.Book",
        "name_pattern": "publishers/{publisher}/books/{book}/revisions/{revision}",
        "fields": [
            { "name": "name", "type_name": "string" },
            { "name": "snapshot", "type_name": "library.Book" },
            { "name": "create_time", "type_name": "google.protobuf.Timestamp" },
            { "name": "alternate_ids", "type_name": "string", "repeated": true },
        ],
    })
}

/// Remove a top-level key from a JSON object fixture.
pub fn without(mut value: Value, key: &str) -> Value {
    if let Some(obj) = value.as_object_mut() {
        obj.remove(key);
    }
    value
}

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Writes `.aipcheck/config.yaml` with the given content into a fresh temp project.
pub fn temp_project_config(content: &str) -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let config_dir = dir.path().join(".aipcheck");
    std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");
    let path = config_dir.join("config.yaml");
    std::fs::write(&path, content).expect("Failed to write config file");
    (dir, path)
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
