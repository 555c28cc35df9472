//! Configuration types for aipcheck.
//!
//! This crate provides the configuration read from `.aipcheck/config.yaml`:
//! rule severity overrides, the code convention used by error payloads,
//! message bindings, and revision alias settings.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;
