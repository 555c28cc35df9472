//! Validation entry points.

use crate::model::{MessageBindings, ResourceRevision, RevisionSchema, StatusPayload};
use crate::options::CheckOptions;
use crate::parse;
use crate::path::FieldPath;
use crate::registry::{Candidate, CheckContext, RuleRegistry};
use crate::report::{Report, Violation};
use aipcheck_common_config::{AipcheckConfig, ConfigLoader};
use aipcheck_common_core::{Error, Result};
use aipcheck_common_log::spans::{check_span, Timer};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, trace};

/// Runs registered rules over parsed documents.
///
/// Rule violations never surface as `Err`; only undecodable input does.
#[derive(Debug, Clone)]
pub struct Checker {
    registry: RuleRegistry,
    options: CheckOptions,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker {
    /// Built-in rules with default options.
    pub fn new() -> Self {
        Self::with_registry(RuleRegistry::builtin(), CheckOptions::default())
    }

    pub fn with_registry(registry: RuleRegistry, options: CheckOptions) -> Self {
        Self { registry, options }
    }

    /// Built-in rules with configured overrides applied.
    pub fn from_config(config: &AipcheckConfig) -> Result<Self> {
        let mut registry = RuleRegistry::builtin();
        registry.apply_overrides(&config.rules)?;
        let options = CheckOptions::from_config(config)?;
        debug!(
            rules = registry.len(),
            disabled = config.rules.disabled.len(),
            "checker configured"
        );
        Ok(Self::with_registry(registry, options))
    }

    /// Load `.aipcheck/config.yaml` under `project_dir`, or the file named by
    /// `AIPCHECK_CONFIG_PATH`.
    pub fn load(project_dir: impl AsRef<Path>) -> Result<Self> {
        let config = ConfigLoader::from_env_or(project_dir).load()?;
        Self::from_config(&config)
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    fn run(
        &self,
        candidate: Candidate<'_>,
        base: &FieldPath,
        bindings: Option<&MessageBindings>,
        report: &mut Report,
    ) {
        let ctx = CheckContext {
            base,
            options: &self.options,
            bindings,
        };
        for rule in self.registry.active(candidate.category()) {
            trace!(rule = %rule.spec.id, path = %base, "evaluating rule");
            for finding in (rule.spec.predicate)(&candidate, &ctx) {
                debug!(
                    rule = %rule.spec.id,
                    severity = %rule.severity,
                    path = %finding.path,
                    "rule violated"
                );
                report.push(Violation::new(rule.spec.id, rule.severity, finding));
            }
        }
    }

    pub fn check_status(&self, status: &StatusPayload) -> Report {
        self.check_status_at(status, &FieldPath::root(), None)
    }

    pub fn check_status_with_bindings(
        &self,
        status: &StatusPayload,
        bindings: &MessageBindings,
    ) -> Report {
        self.check_status_at(status, &FieldPath::root(), Some(bindings))
    }

    /// Check a status located at `base` within a larger document.
    pub fn check_status_at(
        &self,
        status: &StatusPayload,
        base: &FieldPath,
        bindings: Option<&MessageBindings>,
    ) -> Report {
        let _span = check_span("status").entered();
        let timer = Timer::start("check_status");
        let mut report = Report::new();
        self.run(Candidate::Status(status), base, bindings, &mut report);
        timer.finish();
        report
    }

    /// Check a JSON status, bare or in an `{"error": ...}` envelope.
    pub fn check_status_json(
        &self,
        value: &Value,
        bindings: Option<&MessageBindings>,
    ) -> Result<Report> {
        let (status, base) = parse::parse_status_document(value)?;
        Ok(self.check_status_at(&status, &base, bindings))
    }

    pub fn check_status_str(&self, input: &str) -> Result<Report> {
        self.check_status_json(&parse_json(input)?, None)
    }

    pub fn check_revision_schema(&self, schema: &RevisionSchema) -> Report {
        let _span = check_span("revision_schema").entered();
        aipcheck_common_log::timed!("check_revision_schema", {
            let mut report = Report::new();
            self.run(Candidate::Schema(schema), &FieldPath::root(), None, &mut report);
            report
        })
    }

    pub fn check_revision_schema_json(&self, value: &Value) -> Result<Report> {
        Ok(self.check_revision_schema(&parse::parse_revision_schema(value)?))
    }

    pub fn check_revision(&self, revision: &ResourceRevision) -> Report {
        let _span = check_span("revision").entered();
        let mut report = Report::new();
        self.run(Candidate::Revision(revision), &FieldPath::root(), None, &mut report);
        report
    }

    /// Instance rules for each revision (at `[i]`), then history rules.
    pub fn check_revision_history(&self, revisions: &[ResourceRevision]) -> Report {
        let _span = check_span("revision_history").entered();
        let timer = Timer::start("check_revision_history");
        let root = FieldPath::root();
        let mut report = Report::new();
        for (i, revision) in revisions.iter().enumerate() {
            self.run(Candidate::Revision(revision), &root.index(i), None, &mut report);
        }
        self.run(Candidate::History(revisions), &root, None, &mut report);
        timer.finish();
        report
    }

    /// Check a revision document: an object is one instance, an array a history.
    pub fn check_revision_json(&self, value: &Value) -> Result<Report> {
        if value.is_array() {
            let revisions = parse::parse_revision_list(value)?;
            Ok(self.check_revision_history(&revisions))
        } else {
            let revision = parse::parse_revision(value, &FieldPath::root())?;
            Ok(self.check_revision(&revision))
        }
    }

    pub fn check_revision_str(&self, input: &str) -> Result<Report> {
        self.check_revision_json(&parse_json(input)?)
    }

    /// Check an error payload and a revision document together.
    ///
    /// A part that cannot be decoded contributes no violations and its error
    /// is kept in [`DocumentReport::errors`]; the other part is still checked.
    pub fn check_document(
        &self,
        status: Option<&Value>,
        revision: Option<&Value>,
    ) -> DocumentReport {
        let mut errors = Vec::new();
        let mut settle = |result: Result<Report>| {
            result.unwrap_or_else(|e| {
                debug!(error = %e, "document part skipped");
                errors.push(e);
                Report::new()
            })
        };
        let status_report =
            status.map_or_else(Report::new, |v| settle(self.check_status_json(v, None)));
        let revision_report =
            revision.map_or_else(Report::new, |v| settle(self.check_revision_json(v)));
        DocumentReport {
            report: Report::aggregate(status_report, revision_report),
            errors,
        }
    }
}

/// Result of [`Checker::check_document`].
#[derive(Debug)]
pub struct DocumentReport {
    /// Violations from every part that decoded, error results first.
    pub report: Report,
    /// Decode failures, status part before revision part.
    pub errors: Vec<Error>,
}

impl DocumentReport {
    /// Every supplied part was decoded and checked.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

fn parse_json(input: &str) -> Result<Value> {
    serde_json::from_str(input).map_err(|e| {
        Error::malformed(
            FieldPath::root(),
            format!("invalid JSON at line {} column {}: {e}", e.line(), e.column()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RuleId;
    use aipcheck_common_core::Severity;
    use serde_json::json;

    #[test]
    fn test_disabled_rule_never_reports() {
        let mut config = AipcheckConfig::default();
        config.rules.disabled.push("MissingErrorInfo".to_string());
        let checker = Checker::from_config(&config).unwrap();

        let report = checker.check_status_json(&json!({ "code": 404 }), None).unwrap();
        assert_eq!(report.count(RuleId::MissingErrorInfo), 0);
    }

    #[test]
    fn test_severity_override_applies() {
        let mut config = AipcheckConfig::default();
        config
            .rules
            .severity
            .insert("MissingErrorInfo".to_string(), Severity::Warning);
        let checker = Checker::from_config(&config).unwrap();

        let report = checker.check_status_json(&json!({ "code": 404 }), None).unwrap();
        let violation = report.by_rule(RuleId::MissingErrorInfo).next().unwrap();
        assert_eq!(violation.severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_rule_in_config_is_rejected() {
        let mut config = AipcheckConfig::default();
        config.rules.disabled.push("NoSuchRule".to_string());
        assert!(matches!(
            Checker::from_config(&config).unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = Checker::new().check_status_str("{ \"code\": ").unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_revision_json_dispatches_on_shape() {
        let checker = Checker::new();
        let single = json!({ "name": "books/b1/revisions/r1", "snapshot": {} });
        assert_eq!(
            checker.check_revision_json(&single).unwrap().rule_ids(),
            vec![RuleId::MissingField]
        );

        let history = json!([single, single]);
        let report = checker.check_revision_json(&history).unwrap();
        let paths: Vec<&str> = report.violations().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["[0].create_time", "[1].create_time", "[1].name"]);
    }

    #[test]
    fn test_document_keeps_status_results_when_revision_is_malformed() {
        let status = json!({ "code": 404, "status": "NOT_FOUND" });
        let outcome = Checker::new().check_document(Some(&status), Some(&json!(42)));
        assert_eq!(outcome.report.rule_ids(), vec![RuleId::MissingErrorInfo]);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].is_malformed_input());
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_paths_follow_envelope() {
        let doc = json!({ "error": { "code": 404, "status": "NOT_FOUND", "details": [] } });
        let report = Checker::new().check_status_json(&doc, None).unwrap();
        assert_eq!(report.violations()[0].path, "error.details");
    }
}
