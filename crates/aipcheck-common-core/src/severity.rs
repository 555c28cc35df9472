//! Finding severity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a finding is.
///
/// `Error` marks a documented constraint that is unmet. `Warning` marks a
/// condition the checker could not verify mechanically, or advisory guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory or unverifiable.
    Warning,
    /// A rule violation.
    Error,
}

impl Severity {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "warn" | "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Lowercase name as used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Is this a hard failure?
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("error", Some(Severity::Error))]
    #[test_case("ERROR", Some(Severity::Error))]
    #[test_case("warning", Some(Severity::Warning))]
    #[test_case("warn", Some(Severity::Warning))]
    #[test_case("fatal", None)]
    fn test_parse(input: &str, expected: Option<Severity>) {
        assert_eq!(Severity::parse(input), expected);
    }

    #[test]
    fn test_serialization() {
        assert_eq!(serde_json::to_string(&Severity::Error).unwrap(), "\"error\"");
        let parsed: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, Severity::Warning);
    }

    #[test]
    fn test_ordering_puts_error_above_warning() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Error.is_error());
        assert!(!Severity::Warning.is_error());
    }
}
