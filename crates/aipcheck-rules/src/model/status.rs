//! Error response payloads.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A `google.rpc.Status` error payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusPayload {
    /// Numeric code, read per the configured convention.
    pub code: i64,
    /// Canonical code name (`status` in the HTTP/JSON form).
    pub status: Option<String>,
    /// Developer-facing message.
    pub message: String,
    /// Detail payloads, in input order.
    pub details: Vec<Detail>,
}

impl StatusPayload {
    /// `ErrorInfo` details with their index in `details`.
    pub fn error_infos(&self) -> impl Iterator<Item = (usize, &ErrorInfo)> {
        self.details.iter().enumerate().filter_map(|(i, d)| match d {
            Detail::ErrorInfo(info) => Some((i, info)),
            _ => None,
        })
    }

    /// `LocalizedMessage` details with their index in `details`.
    pub fn localized_messages(&self) -> impl Iterator<Item = (usize, &LocalizedMessage)> {
        self.details.iter().enumerate().filter_map(|(i, d)| match d {
            Detail::LocalizedMessage(msg) => Some((i, msg)),
            _ => None,
        })
    }

    /// `Help` details with their index in `details`.
    pub fn helps(&self) -> impl Iterator<Item = (usize, &Help)> {
        self.details.iter().enumerate().filter_map(|(i, d)| match d {
            Detail::Help(help) => Some((i, help)),
            _ => None,
        })
    }
}

/// Detail payload kind, derived from the `@type` URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DetailType {
    ErrorInfo,
    RetryInfo,
    DebugInfo,
    QuotaFailure,
    PreconditionFailure,
    BadRequest,
    RequestInfo,
    ResourceInfo,
    Help,
    LocalizedMessage,
    /// Anything else, keyed by its full type URL.
    Other(String),
}

impl DetailType {
    /// Classify a type URL such as `type.googleapis.com/google.rpc.ErrorInfo`.
    ///
    /// The message name after the last `/` must be `google.rpc.<Name>` or a
    /// bare `<Name>`. Same-named messages from other packages are opaque.
    pub fn from_type_url(type_url: &str) -> Self {
        let message = type_url.rsplit('/').next().unwrap_or(type_url);
        let short = message.strip_prefix("google.rpc.").unwrap_or(message);
        if short.contains('.') {
            return Self::Other(type_url.to_string());
        }
        match short {
            "ErrorInfo" => Self::ErrorInfo,
            "RetryInfo" => Self::RetryInfo,
            "DebugInfo" => Self::DebugInfo,
            "QuotaFailure" => Self::QuotaFailure,
            "PreconditionFailure" => Self::PreconditionFailure,
            "BadRequest" => Self::BadRequest,
            "RequestInfo" => Self::RequestInfo,
            "ResourceInfo" => Self::ResourceInfo,
            "Help" => Self::Help,
            "LocalizedMessage" => Self::LocalizedMessage,
            _ => Self::Other(type_url.to_string()),
        }
    }
}

impl fmt::Display for DetailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(url) => f.write_str(url),
            known => write!(f, "{known:?}"),
        }
    }
}

/// One entry of `Status.details`.
#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    ErrorInfo(ErrorInfo),
    LocalizedMessage(LocalizedMessage),
    Help(Help),
    /// A detail whose body the checker does not inspect.
    Opaque(DetailType),
}

impl Detail {
    /// Kind of this detail.
    pub fn detail_type(&self) -> DetailType {
        match self {
            Self::ErrorInfo(_) => DetailType::ErrorInfo,
            Self::LocalizedMessage(_) => DetailType::LocalizedMessage,
            Self::Help(_) => DetailType::Help,
            Self::Opaque(kind) => kind.clone(),
        }
    }
}

/// Protobuf JSON reads an explicit `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Machine-readable error identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(deserialize_with = "null_as_default")]
    pub domain: String,
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: BTreeMap<String, String>,
}

impl ErrorInfo {
    pub fn new(reason: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            domain: domain.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// User-facing message in a specific locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizedMessage {
    #[serde(deserialize_with = "null_as_default")]
    pub locale: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
}

/// Links to documentation about the error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Help {
    #[serde(deserialize_with = "null_as_default")]
    pub links: Vec<HelpLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpLink {
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
}

/// Caller-supplied association between message template variables and the
/// `ErrorInfo.metadata` keys that carry their values.
///
/// Free text cannot be parsed reliably, so the checker only knows which
/// metadata a message depends on when it is told.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBindings {
    variables: BTreeMap<String, String>,
}

impl MessageBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a template variable to a metadata key.
    pub fn bind(mut self, variable: impl Into<String>, metadata_key: impl Into<String>) -> Self {
        self.variables.insert(variable.into(), metadata_key.into());
        self
    }

    /// (variable, metadata key) pairs in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables.iter().map(|(v, k)| (v.as_str(), k.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl From<BTreeMap<String, String>> for MessageBindings {
    fn from(variables: BTreeMap<String, String>) -> Self {
        Self { variables }
    }
}
