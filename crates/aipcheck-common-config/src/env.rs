//! Environment variable handling.

use std::env;

/// Environment variable names.
pub mod vars {
    /// Explicit config file location, bypassing `.aipcheck/config.yaml`.
    pub const AIPCHECK_CONFIG_PATH: &str = "AIPCHECK_CONFIG_PATH";
}

/// Environment access helpers.
pub struct Environment;

impl Environment {
    /// Get an optional string variable. Empty values count as unset.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok().filter(|v| !v.trim().is_empty())
    }
}
