//! Rule registry.
//!
//! Rules are registered statically: [`BUILTIN_RULES`] is a `const` table of
//! (identifier, category, severity, predicate) entries. Configuration may
//! disable a rule or change its severity, but cannot add predicates.

use crate::model::{MessageBindings, ResourceRevision, RevisionSchema, StatusPayload};
use crate::options::CheckOptions;
use crate::path::FieldPath;
use crate::{error_response, revision};
use aipcheck_common_config::RuleOverrides;
use aipcheck_common_core::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Identifier of a documented constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleId {
    InvalidCode,
    StatusCodeMismatch,
    OkStatusInError,
    MissingErrorInfo,
    DuplicateErrorInfo,
    MalformedReason,
    MissingDomain,
    MalformedMetadataKey,
    MissingDynamicMetadata,
    UnverifiableDynamicContent,
    DuplicateDetailType,
    IncompleteLocalizedMessage,
    MalformedLocale,
    MissingHelpDescription,
    MalformedHelpUrl,
    MalformedRevisionName,
    MissingField,
    FieldTypeMismatch,
    MalformedTimestamp,
    DuplicateAlternateId,
    MalformedAlias,
    NonMonotonicCreateTime,
    DuplicateRevisionId,
    AmbiguousAlias,
}

impl RuleId {
    pub const ALL: [RuleId; 24] = [
        Self::InvalidCode,
        Self::StatusCodeMismatch,
        Self::OkStatusInError,
        Self::MissingErrorInfo,
        Self::DuplicateErrorInfo,
        Self::MalformedReason,
        Self::MissingDomain,
        Self::MalformedMetadataKey,
        Self::MissingDynamicMetadata,
        Self::UnverifiableDynamicContent,
        Self::DuplicateDetailType,
        Self::IncompleteLocalizedMessage,
        Self::MalformedLocale,
        Self::MissingHelpDescription,
        Self::MalformedHelpUrl,
        Self::MalformedRevisionName,
        Self::MissingField,
        Self::FieldTypeMismatch,
        Self::MalformedTimestamp,
        Self::DuplicateAlternateId,
        Self::MalformedAlias,
        Self::NonMonotonicCreateTime,
        Self::DuplicateRevisionId,
        Self::AmbiguousAlias,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCode => "InvalidCode",
            Self::StatusCodeMismatch => "StatusCodeMismatch",
            Self::OkStatusInError => "OkStatusInError",
            Self::MissingErrorInfo => "MissingErrorInfo",
            Self::DuplicateErrorInfo => "DuplicateErrorInfo",
            Self::MalformedReason => "MalformedReason",
            Self::MissingDomain => "MissingDomain",
            Self::MalformedMetadataKey => "MalformedMetadataKey",
            Self::MissingDynamicMetadata => "MissingDynamicMetadata",
            Self::UnverifiableDynamicContent => "UnverifiableDynamicContent",
            Self::DuplicateDetailType => "DuplicateDetailType",
            Self::IncompleteLocalizedMessage => "IncompleteLocalizedMessage",
            Self::MalformedLocale => "MalformedLocale",
            Self::MissingHelpDescription => "MissingHelpDescription",
            Self::MalformedHelpUrl => "MalformedHelpUrl",
            Self::MalformedRevisionName => "MalformedRevisionName",
            Self::MissingField => "MissingField",
            Self::FieldTypeMismatch => "FieldTypeMismatch",
            Self::MalformedTimestamp => "MalformedTimestamp",
            Self::DuplicateAlternateId => "DuplicateAlternateId",
            Self::MalformedAlias => "MalformedAlias",
            Self::NonMonotonicCreateTime => "NonMonotonicCreateTime",
            Self::DuplicateRevisionId => "DuplicateRevisionId",
            Self::AmbiguousAlias => "AmbiguousAlias",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == s)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which validator a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    ErrorResponse,
    Revision,
}

/// A typed object handed to predicates.
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    Status(&'a StatusPayload),
    Schema(&'a RevisionSchema),
    Revision(&'a ResourceRevision),
    History(&'a [ResourceRevision]),
}

impl Candidate<'_> {
    pub fn category(&self) -> RuleCategory {
        match self {
            Self::Status(_) => RuleCategory::ErrorResponse,
            Self::Schema(_) | Self::Revision(_) | Self::History(_) => RuleCategory::Revision,
        }
    }
}

/// Everything a predicate may consult besides the candidate itself.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Path of the candidate within the input.
    pub base: &'a FieldPath,
    pub options: &'a CheckOptions,
    /// Per-call bindings; take precedence over configured ones.
    pub bindings: Option<&'a MessageBindings>,
}

/// One failed check, before severity is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub path: FieldPath,
    pub message: String,
}

impl Finding {
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

/// A rule's check. An empty result means the candidate passes.
pub type Predicate = fn(&Candidate<'_>, &CheckContext<'_>) -> Vec<Finding>;

/// Static description of a rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub id: RuleId,
    pub category: RuleCategory,
    pub severity: Severity,
    pub summary: &'static str,
    pub predicate: Predicate,
}

/// A rule as currently configured.
#[derive(Debug, Clone, Copy)]
pub struct RegisteredRule {
    pub spec: RuleSpec,
    pub severity: Severity,
    pub enabled: bool,
}

/// Registry errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("rule `{0}` is already registered")]
    DuplicateRule(RuleId),

    #[error("unknown rule identifier `{0}`")]
    UnknownRule(String),
}

impl From<RegistryError> for aipcheck_common_core::Error {
    fn from(err: RegistryError) -> Self {
        Self::config(err.to_string())
    }
}

const fn rule(
    id: RuleId,
    category: RuleCategory,
    severity: Severity,
    summary: &'static str,
    predicate: Predicate,
) -> RuleSpec {
    RuleSpec {
        id,
        category,
        severity,
        summary,
        predicate,
    }
}

use RuleCategory::{ErrorResponse, Revision};
const ERROR: Severity = Severity::Error;
const WARNING: Severity = Severity::Warning;

/// Built-in rules, in evaluation order.
#[rustfmt::skip]
pub const BUILTIN_RULES: &[RuleSpec] = &[
    rule(RuleId::InvalidCode, ErrorResponse, ERROR,
        "code and status name belong to the canonical code set", error_response::invalid_code),
    rule(RuleId::StatusCodeMismatch, ErrorResponse, ERROR,
        "status name agrees with the numeric code", error_response::status_code_mismatch),
    rule(RuleId::OkStatusInError, ErrorResponse, ERROR,
        "an error payload never carries OK", error_response::ok_status_in_error),
    rule(RuleId::MissingErrorInfo, ErrorResponse, ERROR,
        "details contain an ErrorInfo", error_response::missing_error_info),
    rule(RuleId::DuplicateErrorInfo, ErrorResponse, ERROR,
        "details contain at most one ErrorInfo", error_response::duplicate_error_info),
    rule(RuleId::MalformedReason, ErrorResponse, ERROR,
        "ErrorInfo.reason is UPPER_SNAKE_CASE and at most 63 characters", error_response::malformed_reason),
    rule(RuleId::MissingDomain, ErrorResponse, ERROR,
        "ErrorInfo.domain is a non-empty, globally scoped name", error_response::missing_domain),
    rule(RuleId::MalformedMetadataKey, ErrorResponse, ERROR,
        "metadata keys are lowerCamelCase-ish and at most 64 characters", error_response::malformed_metadata_key),
    rule(RuleId::MissingDynamicMetadata, ErrorResponse, ERROR,
        "dynamic message content is backed by ErrorInfo.metadata", error_response::missing_dynamic_metadata),
    rule(RuleId::UnverifiableDynamicContent, ErrorResponse, WARNING,
        "message text could not be correlated with metadata", error_response::unverifiable_dynamic_content),
    rule(RuleId::DuplicateDetailType, ErrorResponse, ERROR,
        "each detail type appears at most once", error_response::duplicate_detail_type),
    rule(RuleId::IncompleteLocalizedMessage, ErrorResponse, ERROR,
        "LocalizedMessage sets locale and message together", error_response::incomplete_localized_message),
    rule(RuleId::MalformedLocale, ErrorResponse, ERROR,
        "LocalizedMessage.locale is a BCP-47 tag", error_response::malformed_locale),
    rule(RuleId::MissingHelpDescription, ErrorResponse, WARNING,
        "Help links describe their target", error_response::missing_help_description),
    rule(RuleId::MalformedHelpUrl, ErrorResponse, ERROR,
        "Help links use absolute http(s) URLs", error_response::malformed_help_url),
    rule(RuleId::MalformedRevisionName, Revision, ERROR,
        "revision names end in /revisions/{id}", revision::checks::malformed_revision_name),
    rule(RuleId::MissingField, Revision, ERROR,
        "revisions carry name, snapshot and create_time", revision::checks::missing_field),
    rule(RuleId::FieldTypeMismatch, Revision, ERROR,
        "revision fields have their documented types", revision::checks::field_type_mismatch),
    rule(RuleId::MalformedTimestamp, Revision, ERROR,
        "create_time is an RFC 3339 timestamp", revision::checks::malformed_timestamp),
    rule(RuleId::DuplicateAlternateId, Revision, ERROR,
        "alternate_ids is a set", revision::checks::duplicate_alternate_id),
    rule(RuleId::MalformedAlias, Revision, ERROR,
        "aliases are well-formed identifiers", revision::checks::malformed_alias),
    rule(RuleId::NonMonotonicCreateTime, Revision, ERROR,
        "create_time never decreases across revisions of a parent", revision::checks::non_monotonic_create_time),
    rule(RuleId::DuplicateRevisionId, Revision, ERROR,
        "revision ids are unique per parent", revision::checks::duplicate_revision_id),
    rule(RuleId::AmbiguousAlias, Revision, ERROR,
        "an alias resolves to exactly one revision", revision::checks::ambiguous_alias),
];

/// Rules by identifier, in registration order.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<RegisteredRule>,
    index: BTreeMap<RuleId, usize>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in rule at its default severity.
    pub fn builtin() -> Self {
        Self::from_specs(BUILTIN_RULES).expect("built-in rule identifiers are unique")
    }

    /// Register each spec in order.
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(*spec)?;
        }
        Ok(registry)
    }

    /// Register a rule; identifiers must be unique.
    pub fn register(&mut self, spec: RuleSpec) -> Result<(), RegistryError> {
        if self.index.contains_key(&spec.id) {
            return Err(RegistryError::DuplicateRule(spec.id));
        }
        self.index.insert(spec.id, self.rules.len());
        self.rules.push(RegisteredRule {
            spec,
            severity: spec.severity,
            enabled: true,
        });
        Ok(())
    }

    pub fn get(&self, id: RuleId) -> Option<&RegisteredRule> {
        self.index.get(&id).map(|&i| &self.rules[i])
    }

    fn get_mut(&mut self, id: RuleId) -> Result<&mut RegisteredRule, RegistryError> {
        match self.index.get(&id) {
            Some(&i) => Ok(&mut self.rules[i]),
            None => Err(RegistryError::UnknownRule(id.to_string())),
        }
    }

    /// Every registered rule of a category, enabled or not.
    pub fn by_category(&self, category: RuleCategory) -> impl Iterator<Item = &RegisteredRule> {
        self.rules
            .iter()
            .filter(move |r| r.spec.category == category)
    }

    /// Enabled rules of a category, in registration order.
    pub fn active(&self, category: RuleCategory) -> impl Iterator<Item = &RegisteredRule> {
        self.by_category(category).filter(|r| r.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn disable(&mut self, id: RuleId) -> Result<(), RegistryError> {
        self.get_mut(id)?.enabled = false;
        Ok(())
    }

    pub fn set_severity(&mut self, id: RuleId, severity: Severity) -> Result<(), RegistryError> {
        self.get_mut(id)?.severity = severity;
        Ok(())
    }

    /// Apply configured overrides. Identifiers are matched exactly.
    pub fn apply_overrides(&mut self, overrides: &RuleOverrides) -> Result<(), RegistryError> {
        let lookup = |raw: &str| RuleId::parse(raw).ok_or_else(|| RegistryError::UnknownRule(raw.to_string()));

        for raw in &overrides.disabled {
            self.disable(lookup(raw.as_str())?)?;
        }
        for (raw, severity) in &overrides.severity {
            self.set_severity(lookup(raw.as_str())?, *severity)?;
        }
        Ok(())
    }
}
