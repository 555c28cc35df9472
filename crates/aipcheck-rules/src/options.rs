//! Resolved check options.

use crate::model::MessageBindings;
use aipcheck_common_config::{AipcheckConfig, CodeConvention, DEFAULT_ALIAS_PATTERN};
use aipcheck_common_core::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

static DEFAULT_ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_ALIAS_PATTERN).expect("default alias pattern is valid"));

/// Configuration values predicates consult, compiled once.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub code_convention: CodeConvention,
    pub require_status_name: bool,
    /// Message bindings keyed by `ErrorInfo.reason`.
    pub bindings: BTreeMap<String, MessageBindings>,
    pub alias_pattern: Regex,
    pub reserved_aliases: BTreeSet<String>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            code_convention: CodeConvention::default(),
            require_status_name: false,
            bindings: BTreeMap::new(),
            alias_pattern: DEFAULT_ALIAS.clone(),
            reserved_aliases: BTreeSet::from(["latest".to_string()]),
        }
    }
}

impl CheckOptions {
    pub fn from_config(config: &AipcheckConfig) -> Result<Self> {
        let alias_pattern = Regex::new(&config.revision.alias_pattern).map_err(|e| {
            Error::config(format!(
                "invalid revision.alias_pattern `{}`: {e}",
                config.revision.alias_pattern
            ))
        })?;

        let bindings = config
            .error_response
            .bindings
            .iter()
            .map(|(reason, vars)| (reason.clone(), MessageBindings::from(vars.clone())))
            .collect();

        Ok(Self {
            code_convention: config.error_response.code_convention,
            require_status_name: config.error_response.require_status_name,
            bindings,
            alias_pattern,
            reserved_aliases: config.revision.reserved_aliases.iter().cloned().collect(),
        })
    }

    /// Configured bindings for an `ErrorInfo.reason`.
    pub fn bindings_for(&self, reason: &str) -> Option<&MessageBindings> {
        self.bindings.get(reason).filter(|b| !b.is_empty())
    }

    pub fn is_reserved_alias(&self, alias: &str) -> bool {
        self.reserved_aliases.contains(alias)
    }
}
