//! Violation reports.

use crate::registry::{Finding, RuleId};
use aipcheck_common_core::{Error, Result, Severity};
use serde::{Deserialize, Serialize};

/// One violated rule at one place in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub rule_id: RuleId,
    pub severity: Severity,
    pub message: String,
    /// Field path rooted at the input, e.g. `error.details[0].reason`.
    pub path: String,
}

impl Violation {
    pub fn new(rule_id: RuleId, severity: Severity, finding: Finding) -> Self {
        Self {
            rule_id,
            severity,
            message: finding.message,
            path: finding.path.into(),
        }
    }
}

/// Ordered violations. Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    violations: Vec<Violation>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error response results first, then revision results. Order within each
    /// is kept and nothing is deduplicated.
    pub fn aggregate(error_response: Report, revision: Report) -> Self {
        let mut report = error_response;
        report.extend(revision);
        report
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn extend(&mut self, other: Report) {
        self.violations.extend(other.violations);
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations of one rule.
    pub fn by_rule(&self, rule_id: RuleId) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.rule_id == rule_id)
    }

    pub fn count(&self, rule_id: RuleId) -> usize {
        self.by_rule(rule_id).count()
    }

    pub fn error_count(&self) -> usize {
        self.violations.iter().filter(|v| v.severity.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.len() - self.error_count()
    }

    /// No error-severity violations. Warnings are allowed.
    pub fn passes(&self) -> bool {
        self.error_count() == 0
    }

    /// Rule ids in report order, for compact assertions.
    pub fn rule_ids(&self) -> Vec<RuleId> {
        self.violations.iter().map(|v| v.rule_id).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl IntoIterator for Report {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl FromIterator<Violation> for Report {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self {
            violations: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::FieldPath;
    use pretty_assertions::assert_eq;

    fn violation(rule_id: RuleId, severity: Severity, path: &str) -> Violation {
        Violation {
            rule_id,
            severity,
            message: format!("{rule_id} at {path}"),
            path: path.to_string(),
        }
    }

    #[test]
    fn test_wire_shape() {
        let finding = Finding::new(
            FieldPath::root().field("error").field("details").index(0).field("reason"),
            "bad reason",
        );
        let report: Report = [Violation::new(RuleId::MalformedReason, Severity::Error, finding)]
            .into_iter()
            .collect();

        assert_eq!(
            report.to_json().unwrap(),
            r#"[{"ruleId":"MalformedReason","severity":"error","message":"bad reason","path":"error.details[0].reason"}]"#
        );
    }

    #[test]
    fn test_aggregate_keeps_validator_order() {
        let errors: Report = [
            violation(RuleId::MissingDomain, Severity::Error, "details[0].domain"),
            violation(RuleId::InvalidCode, Severity::Error, "code"),
        ]
        .into_iter()
        .collect();
        let revisions: Report = [
            violation(RuleId::MissingField, Severity::Error, "create_time"),
            violation(RuleId::MissingDomain, Severity::Error, "details[0].domain"),
        ]
        .into_iter()
        .collect();

        let report = Report::aggregate(errors, revisions);
        assert_eq!(
            report.rule_ids(),
            vec![
                RuleId::MissingDomain,
                RuleId::InvalidCode,
                RuleId::MissingField,
                RuleId::MissingDomain
            ]
        );
        assert_eq!(report.count(RuleId::MissingDomain), 2);
    }

    #[test]
    fn test_counts_by_severity() {
        let report: Report = [
            violation(RuleId::UnverifiableDynamicContent, Severity::Warning, "message"),
            violation(RuleId::MalformedReason, Severity::Error, "details[0].reason"),
        ]
        .into_iter()
        .collect();
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert!(!report.passes());

        let warnings_only: Report = report
            .into_iter()
            .filter(|v| v.severity == Severity::Warning)
            .collect();
        assert!(warnings_only.passes());
    }

    #[test]
    fn test_report_deserializes_from_wire() {
        let json = r#"[{"ruleId":"MissingField","severity":"error","message":"`create_time` is required","path":"create_time"}]"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert_eq!(report.violations()[0].rule_id, RuleId::MissingField);
        assert_eq!(report.to_json().unwrap(), json);
    }
}
