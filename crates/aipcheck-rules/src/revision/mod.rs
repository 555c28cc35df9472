//! Resource revisions: rules, aliases and the revision lifecycle.

pub mod alias;
pub(crate) mod checks;
pub mod history;

pub use alias::{AliasState, AliasTable};
pub use history::{HistoryError, RevisionHistory, StoredRevision, LATEST_ALIAS};
