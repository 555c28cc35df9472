//! Field paths into checked documents.

use std::fmt;

/// Dotted path to a field within an input document, e.g. `error.details[0].reason`.
///
/// The root path renders as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Child field.
    pub fn field(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{}", self.0, name))
        }
    }

    /// Array element.
    pub fn index(&self, i: usize) -> Self {
        Self(format!("{}[{}]", self.0, i))
    }

    /// Rendered path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Is this the document root?
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_render_like_accessors() {
        let root = FieldPath::root();
        assert!(root.is_root());
        assert_eq!(root.field("create_time").as_str(), "create_time");
        assert_eq!(root.index(2).field("name").as_str(), "[2].name");
        assert_eq!(
            root.field("error").field("details").index(0).field("reason").to_string(),
            "error.details[0].reason"
        );
    }
}
