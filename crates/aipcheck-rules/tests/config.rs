use aipcheck_common_core::{Error, Severity};
use aipcheck_rules::{Checker, RuleId};
use aipcheck_test_utils::{assert_err, assert_ok, resource_exhausted, temp_project_config};
use serde_json::json;

#[test]
fn test_checker_loads_project_config() {
    let (dir, _path) = temp_project_config(
        r#"
rules:
  disabled: [MissingErrorInfo]
  severity:
    UnverifiableDynamicContent: error
"#,
    );
    let checker = assert_ok!(Checker::load(dir.path()));

    let report = assert_ok!(checker.check_status_json(&json!({ "code": 404 }), None));
    assert!(report.is_empty());

    let doc = resource_exhausted().message("zone exhausted").build();
    let report = assert_ok!(checker.check_status_json(&doc, None));
    assert_eq!(report.rule_ids(), vec![RuleId::UnverifiableDynamicContent]);
    assert_eq!(report.violations()[0].severity, Severity::Error);
    assert!(!report.passes());
}

#[test]
fn test_unknown_rule_in_project_config() {
    let (dir, _path) = temp_project_config("rules:\n  disabled: [NotARule]\n");
    let err = assert_err!(Checker::load(dir.path()));
    assert!(matches!(err, Error::Config(message) if message.contains("NotARule")));
}

#[test]
fn test_invalid_yaml_is_config_error() {
    let (dir, _path) = temp_project_config("rules: [unterminated\n");
    assert!(matches!(assert_err!(Checker::load(dir.path())), Error::Config(_)));
}
