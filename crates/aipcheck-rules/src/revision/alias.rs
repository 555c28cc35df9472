//! Alias state machine.
//!
//! An alias is either unassigned or points at one revision id. Assignment
//! always succeeds and overwrites; there is no terminal state.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasState {
    Unassigned,
    Assigned(String),
}

impl AliasState {
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Unassigned => None,
            Self::Assigned(target) => Some(target),
        }
    }
}

/// Alias → revision id, for the revisions of one parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `alias` at `target`, returning the previous state.
    pub fn assign(&mut self, alias: impl Into<String>, target: impl Into<String>) -> AliasState {
        match self.aliases.insert(alias.into(), target.into()) {
            Some(previous) => AliasState::Assigned(previous),
            None => AliasState::Unassigned,
        }
    }

    /// Return `alias` to unassigned, returning the previous state.
    pub fn remove(&mut self, alias: &str) -> AliasState {
        match self.aliases.remove(alias) {
            Some(previous) => AliasState::Assigned(previous),
            None => AliasState::Unassigned,
        }
    }

    pub fn state(&self, alias: &str) -> AliasState {
        match self.aliases.get(alias) {
            Some(target) => AliasState::Assigned(target.clone()),
            None => AliasState::Unassigned,
        }
    }

    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Aliases pointing at `target`, in alias order.
    pub fn aliases_for(&self, target: &str) -> Vec<&str> {
        self.aliases
            .iter()
            .filter(|(_, t)| t.as_str() == target)
            .map(|(a, _)| a.as_str())
            .collect()
    }

    /// Unassign every alias pointing at `target`; returns the removed aliases.
    pub fn remove_target(&mut self, target: &str) -> Vec<String> {
        let removed: Vec<String> = self
            .aliases_for(target)
            .into_iter()
            .map(str::to_string)
            .collect();
        for alias in &removed {
            self.aliases.remove(alias);
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_overwrites() {
        let mut table = AliasTable::new();
        assert_eq!(table.assign("stable", "r1"), AliasState::Unassigned);
        assert_eq!(table.assign("stable", "r2"), AliasState::Assigned("r1".to_string()));
        assert_eq!(table.resolve("stable"), Some("r2"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_returns_to_unassigned() {
        let mut table = AliasTable::new();
        table.assign("stable", "r1");
        assert_eq!(table.remove("stable").target(), Some("r1"));
        assert_eq!(table.state("stable"), AliasState::Unassigned);
        assert_eq!(table.remove("stable"), AliasState::Unassigned);

        // Unassigned is not terminal.
        table.assign("stable", "r3");
        assert_eq!(table.resolve("stable"), Some("r3"));
    }

    #[test]
    fn test_remove_target_cascades() {
        let mut table = AliasTable::new();
        table.assign("stable", "r1");
        table.assign("reviewed", "r1");
        table.assign("draft", "r2");

        assert_eq!(table.aliases_for("r1"), vec!["reviewed", "stable"]);
        assert_eq!(table.remove_target("r1"), vec!["reviewed", "stable"]);
        assert_eq!(table.iter().collect::<Vec<_>>(), vec![("draft", "r2")]);
    }
}
