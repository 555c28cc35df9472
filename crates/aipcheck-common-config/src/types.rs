//! Configuration types.

use aipcheck_common_core::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Alias identifiers follow RFC-1034 labels: lowercase, digits, hyphens.
pub const DEFAULT_ALIAS_PATTERN: &str = r"^[a-z]([a-z0-9-]{0,61}[a-z0-9])?$";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AipcheckConfig {
    /// Rule enablement and severity overrides.
    pub rules: RuleOverrides,
    /// Error response checks.
    pub error_response: ErrorResponseConfig,
    /// Revision checks.
    pub revision: RevisionConfig,
}

/// Per-rule overrides, keyed by rule identifier (e.g. `MalformedReason`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOverrides {
    /// Rules that never report.
    pub disabled: Vec<String>,
    /// Severity replacing the rule's default.
    pub severity: BTreeMap<String, Severity>,
}

/// How `Status.code` is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeConvention {
    /// HTTP status code, as in the HTTP/1.1+JSON error schema.
    #[default]
    Http,
    /// Numeric `google.rpc.Code` value.
    Grpc,
}

/// Error response configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorResponseConfig {
    /// How `code` is interpreted.
    pub code_convention: CodeConvention,
    /// Flag payloads without a `status` name.
    pub require_status_name: bool,
    /// Message template variable → metadata key, per `ErrorInfo.reason`.
    pub bindings: BTreeMap<String, BTreeMap<String, String>>,
}

/// Revision configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionConfig {
    /// Regex every alias (alternate id) must match.
    pub alias_pattern: String,
    /// Server-managed aliases.
    pub reserved_aliases: Vec<String>,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            alias_pattern: DEFAULT_ALIAS_PATTERN.to_string(),
            reserved_aliases: vec!["latest".to_string()],
        }
    }
}
