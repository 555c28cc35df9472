//! aipcheck common core types.
//!
//! Everything downstream crates share: the error taxonomy used when an input
//! cannot be checked at all, and the severity attached to every finding.

pub mod error;
pub mod severity;

pub use error::{Error, Result};
pub use severity::Severity;
