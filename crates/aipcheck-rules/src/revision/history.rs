//! Revision lifecycle for one parent resource.
//!
//! Revisions are recorded from a parent snapshot or by rolling back to an
//! earlier revision. `latest` is server-managed and always points at the
//! newest recorded revision.

use super::alias::{AliasState, AliasTable};
use crate::model::ResourceRevision;
use crate::options::CheckOptions;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Alias that tracks the newest revision.
pub const LATEST_ALIAS: &str = "latest";

/// Lifecycle errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("revision `{0}` does not exist")]
    UnknownRevision(String),

    #[error("revision id `{0}` is already used")]
    DuplicateRevision(String),

    #[error("revision id `{0}` is not a valid resource id")]
    InvalidRevisionId(String),

    #[error("create_time {create_time} is earlier than the newest revision ({newest})")]
    NonMonotonic { create_time: String, newest: String },

    #[error("snapshot must be an object")]
    SnapshotNotObject,

    #[error("alias `{0}` is managed by the server")]
    ReservedAlias(String),

    #[error("alias `{alias}` must match {pattern}")]
    InvalidAlias { alias: String, pattern: String },
}

/// A recorded revision.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRevision {
    pub id: String,
    pub snapshot: Value,
    pub create_time: DateTime<Utc>,
}

/// Revisions of one parent, in creation order, plus their aliases.
#[derive(Debug, Clone)]
pub struct RevisionHistory {
    parent: String,
    revisions: Vec<StoredRevision>,
    aliases: AliasTable,
    alias_pattern: Regex,
    reserved: BTreeSet<String>,
}

impl RevisionHistory {
    pub fn new(parent: impl Into<String>, options: &CheckOptions) -> Self {
        let mut reserved = options.reserved_aliases.clone();
        reserved.insert(LATEST_ALIAS.to_string());
        Self {
            parent: parent.into(),
            revisions: Vec::new(),
            aliases: AliasTable::new(),
            alias_pattern: options.alias_pattern.clone(),
            reserved,
        }
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn revisions(&self) -> impl Iterator<Item = &StoredRevision> {
        self.revisions.iter()
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn get(&self, id: &str) -> Option<&StoredRevision> {
        self.revisions.iter().find(|r| r.id == id)
    }

    /// Resolve a revision id or alias.
    pub fn resolve(&self, id_or_alias: &str) -> Option<&StoredRevision> {
        self.get(id_or_alias)
            .or_else(|| self.aliases.resolve(id_or_alias).and_then(|id| self.get(id)))
    }

    pub fn latest(&self) -> Option<&StoredRevision> {
        self.revisions.last()
    }

    /// Record a snapshot of the parent as a new revision.
    pub fn record(
        &mut self,
        id: impl Into<String>,
        snapshot: Value,
        create_time: DateTime<Utc>,
    ) -> Result<&StoredRevision, HistoryError> {
        let id = id.into();
        if id.is_empty() || id.contains('/') {
            return Err(HistoryError::InvalidRevisionId(id));
        }
        if self.get(&id).is_some() {
            return Err(HistoryError::DuplicateRevision(id));
        }
        if !snapshot.is_object() {
            return Err(HistoryError::SnapshotNotObject);
        }
        if let Some(newest) = self.latest() {
            if create_time < newest.create_time {
                return Err(HistoryError::NonMonotonic {
                    create_time: create_time.to_rfc3339(),
                    newest: newest.create_time.to_rfc3339(),
                });
            }
        }

        debug!(parent = %self.parent, revision = %id, "revision recorded");
        self.aliases.assign(LATEST_ALIAS, id.clone());
        self.revisions.push(StoredRevision {
            id,
            snapshot,
            create_time,
        });
        Ok(&self.revisions[self.revisions.len() - 1])
    }

    /// Create a new revision whose snapshot is copied from `target`.
    ///
    /// The target is left untouched; rolling back never rewrites history.
    pub fn rollback(
        &mut self,
        target: &str,
        new_id: impl Into<String>,
        create_time: DateTime<Utc>,
    ) -> Result<&StoredRevision, HistoryError> {
        let snapshot = self
            .resolve(target)
            .map(|r| r.snapshot.clone())
            .ok_or_else(|| HistoryError::UnknownRevision(target.to_string()))?;
        self.record(new_id, snapshot, create_time)
    }

    /// Point a user alias at a revision, returning the alias's previous state.
    pub fn assign_alias(&mut self, alias: &str, target: &str) -> Result<AliasState, HistoryError> {
        self.check_user_alias(alias)?;
        if self.get(target).is_none() {
            return Err(HistoryError::UnknownRevision(target.to_string()));
        }
        Ok(self.aliases.assign(alias, target))
    }

    pub fn remove_alias(&mut self, alias: &str) -> Result<AliasState, HistoryError> {
        self.check_user_alias(alias)?;
        Ok(self.aliases.remove(alias))
    }

    fn check_user_alias(&self, alias: &str) -> Result<(), HistoryError> {
        if self.reserved.contains(alias) {
            return Err(HistoryError::ReservedAlias(alias.to_string()));
        }
        if !self.alias_pattern.is_match(alias) {
            return Err(HistoryError::InvalidAlias {
                alias: alias.to_string(),
                pattern: self.alias_pattern.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Delete a revision and every alias pointing at it.
    ///
    /// Returns the removed revision and the aliases it took with it.
    /// `latest` moves to the newest remaining revision.
    pub fn delete_revision(
        &mut self,
        id: &str,
    ) -> Result<(StoredRevision, Vec<String>), HistoryError> {
        let position = self
            .revisions
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| HistoryError::UnknownRevision(id.to_string()))?;
        let removed = self.revisions.remove(position);

        let mut aliases = self.aliases.remove_target(id);
        aliases.retain(|a| a != LATEST_ALIAS);
        if let Some(newest) = self.revisions.last() {
            self.aliases.assign(LATEST_ALIAS, newest.id.clone());
        } else {
            self.aliases.remove(LATEST_ALIAS);
        }

        debug!(
            parent = %self.parent,
            revision = %id,
            aliases = aliases.len(),
            "revision deleted"
        );
        Ok((removed, aliases))
    }

    /// Full resource name of a revision.
    pub fn revision_name(&self, id: &str) -> String {
        format!("{}/revisions/{id}", self.parent)
    }

    /// The history as revision documents, with aliases as `alternate_ids`.
    pub fn to_resource_revisions(&self) -> Vec<ResourceRevision> {
        self.revisions
            .iter()
            .map(|r| ResourceRevision {
                name: Some(self.revision_name(&r.id)),
                snapshot: Some(r.snapshot.clone()),
                create_time: Some(r.create_time.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                alternate_ids: self
                    .aliases
                    .aliases_for(&r.id)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn history() -> RevisionHistory {
        RevisionHistory::new("publishers/p1/books/b1", &CheckOptions::default())
    }

    #[test]
    fn test_record_tracks_latest() {
        let mut h = history();
        h.record("r1", json!({ "title": "v1" }), at(1)).unwrap();
        h.record("r2", json!({ "title": "v2" }), at(2)).unwrap();

        assert_eq!(h.resolve(LATEST_ALIAS).unwrap().id, "r2");
        assert_eq!(h.latest().unwrap().id, "r2");
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn test_record_rejects_bad_input() {
        let mut h = history();
        h.record("r1", json!({}), at(2)).unwrap();

        assert_eq!(
            h.record("r1", json!({}), at(3)).unwrap_err(),
            HistoryError::DuplicateRevision("r1".to_string())
        );
        assert!(matches!(
            h.record("r0", json!({}), at(1)).unwrap_err(),
            HistoryError::NonMonotonic { .. }
        ));
        assert_eq!(
            h.record("a/b", json!({}), at(3)).unwrap_err(),
            HistoryError::InvalidRevisionId("a/b".to_string())
        );
        assert_eq!(
            h.record("r2", json!("text"), at(3)).unwrap_err(),
            HistoryError::SnapshotNotObject
        );
        // Equal timestamps are allowed.
        assert!(h.record("r2", json!({}), at(2)).is_ok());
    }

    #[test]
    fn test_rollback_copies_snapshot() {
        let mut h = history();
        h.record("r1", json!({ "title": "first" }), at(1)).unwrap();
        h.record("r2", json!({ "title": "second" }), at(2)).unwrap();
        h.assign_alias("stable", "r1").unwrap();

        let rolled = h.rollback("stable", "r3", at(3)).unwrap().clone();
        assert_eq!(rolled.snapshot, json!({ "title": "first" }));
        assert_eq!(h.len(), 3);
        assert_eq!(h.get("r1").unwrap().snapshot, json!({ "title": "first" }));
        assert_eq!(h.resolve(LATEST_ALIAS).unwrap().id, "r3");

        assert_eq!(
            h.rollback("missing", "r4", at(4)).unwrap_err(),
            HistoryError::UnknownRevision("missing".to_string())
        );
    }

    #[test]
    fn test_reassigning_alias_is_a_pointer_update() {
        let mut h = history();
        h.record("r1", json!({}), at(1)).unwrap();
        h.record("r2", json!({}), at(2)).unwrap();

        assert_eq!(h.assign_alias("stable", "r1").unwrap(), AliasState::Unassigned);
        assert_eq!(
            h.assign_alias("stable", "r2").unwrap(),
            AliasState::Assigned("r1".to_string())
        );
        assert_eq!(h.len(), 2);
        assert_eq!(h.remove_alias("stable").unwrap().target(), Some("r2"));
    }

    #[test]
    fn test_user_cannot_touch_latest() {
        let mut h = history();
        h.record("r1", json!({}), at(1)).unwrap();
        assert_eq!(
            h.assign_alias(LATEST_ALIAS, "r1").unwrap_err(),
            HistoryError::ReservedAlias(LATEST_ALIAS.to_string())
        );
        assert!(h.remove_alias(LATEST_ALIAS).is_err());
        assert!(matches!(
            h.assign_alias("Not Valid", "r1").unwrap_err(),
            HistoryError::InvalidAlias { .. }
        ));
        assert_eq!(
            h.assign_alias("stable", "r9").unwrap_err(),
            HistoryError::UnknownRevision("r9".to_string())
        );
    }

    #[test]
    fn test_delete_cascades_to_aliases() {
        let mut h = history();
        h.record("r1", json!({}), at(1)).unwrap();
        h.record("r2", json!({}), at(2)).unwrap();
        h.assign_alias("stable", "r2").unwrap();
        h.assign_alias("reviewed", "r1").unwrap();

        let (removed, aliases) = h.delete_revision("r2").unwrap();
        assert_eq!(removed.id, "r2");
        assert_eq!(aliases, vec!["stable".to_string()]);
        assert_eq!(h.aliases().state("stable"), AliasState::Unassigned);
        assert_eq!(h.resolve(LATEST_ALIAS).unwrap().id, "r1");

        h.delete_revision("r1").unwrap();
        assert!(h.is_empty());
        assert!(h.aliases().is_empty());
    }

    #[test]
    fn test_documents_name_revisions_under_parent() {
        let mut h = history();
        h.record("r1", json!({ "title": "v1" }), at(1)).unwrap();
        h.assign_alias("stable", "r1").unwrap();

        let docs = h.to_resource_revisions();
        assert_eq!(docs[0].name.as_deref(), Some("publishers/p1/books/b1/revisions/r1"));
        assert_eq!(docs[0].create_time.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(docs[0].alternate_ids, vec!["latest".to_string(), "stable".to_string()]);
    }
}
