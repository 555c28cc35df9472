//! Conformance rules for `google.rpc.Status` error payloads and resource
//! revisions.
//!
//! Documents are decoded into typed models ([`model`]), then every enabled
//! rule in the [`RuleRegistry`] runs over them. The result is a [`Report`] of
//! violations with field paths rooted at the input.
//!
//! ```no_run
//! use aipcheck_rules::Checker;
//!
//! let checker = Checker::new();
//! let report = checker
//!     .check_status_str(r#"{"error": {"code": 404, "status": "NOT_FOUND"}}"#)
//!     .unwrap();
//! println!("{}", report.to_json().unwrap());
//! ```

pub mod batch;
pub mod checker;
pub mod codes;
pub mod error_response;
pub mod model;
pub mod options;
pub mod parse;
pub mod path;
pub mod registry;
pub mod report;
pub mod revision;

pub use batch::{BatchInput, BatchRunner};
pub use checker::{Checker, DocumentReport};
pub use codes::CanonicalCode;
pub use options::CheckOptions;
pub use path::FieldPath;
pub use registry::{
    Candidate, CheckContext, Finding, Predicate, RegisteredRule, RegistryError, RuleCategory,
    RuleId, RuleRegistry, RuleSpec, BUILTIN_RULES,
};
pub use report::{Report, Violation};
pub use revision::{AliasState, AliasTable, HistoryError, RevisionHistory, StoredRevision};
