//! Component identifiers and key-paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable identifier of a content component.
///
/// Identifiers are opaque strings assigned by whoever owns the content store.
/// They are displayed verbatim in diagnostics, so a cyclic template error can
/// name the component that repeated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Create an identifier from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ComponentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Error returned when a key-path string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyPathError {
    /// The path has no segments.
    #[error("key path is empty")]
    Empty,
    /// A segment is empty or contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid segment {segment:?} in key path {path:?}")]
    InvalidSegment {
        /// The full path as written.
        path: String,
        /// The offending segment.
        segment: String,
    },
}

/// Dotted path addressing a property or sub-component relative to a component.
///
/// `"title"` addresses a direct property, `"sidebar.pagelets"` walks through
/// the `sidebar` sub-component first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPath(String);

impl KeyPath {
    /// Parse and validate a key-path.
    pub fn new(path: &str) -> Result<Self, KeyPathError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(KeyPathError::Empty);
        }
        for segment in path.split('.') {
            if !is_valid_segment(segment) {
                return Err(KeyPathError::InvalidSegment {
                    path: path.to_owned(),
                    segment: segment.to_owned(),
                });
            }
        }
        Ok(Self(path.to_owned()))
    }

    /// The path as written, segments joined by `.`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments().count()
    }

    /// Always false: a valid key-path has at least one segment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Split into the leading segments and the final one.
    #[must_use]
    pub fn split_last(&self) -> (Vec<&str>, &str) {
        match self.0.rsplit_once('.') {
            Some((head, last)) => (head.split('.').collect(), last),
            None => (Vec::new(), &self.0),
        }
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for KeyPath {
    type Err = KeyPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for KeyPath {
    type Error = KeyPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<KeyPath> for String {
    fn from(value: KeyPath) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_path_single_segment() {
        let path = KeyPath::new("title").unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.split_last(), (Vec::new(), "title"));
    }

    #[test]
    fn test_key_path_nested_segments() {
        let path: KeyPath = "sidebar.pagelets.first".parse().unwrap();
        assert_eq!(path.segments().collect::<Vec<_>>(), ["sidebar", "pagelets", "first"]);
        assert_eq!(path.split_last(), (vec!["sidebar", "pagelets"], "first"));
    }

    #[test]
    fn test_key_path_trims_whitespace() {
        let path = KeyPath::new("  title ").unwrap();
        assert_eq!(path.as_str(), "title");
    }

    #[test]
    fn test_key_path_rejects_empty() {
        assert_eq!(KeyPath::new("   "), Err(KeyPathError::Empty));
    }

    #[test]
    fn test_key_path_rejects_empty_segment() {
        let err = KeyPath::new("a..b").unwrap_err();
        assert!(matches!(err, KeyPathError::InvalidSegment { ref segment, .. } if segment.is_empty()));
    }

    #[test]
    fn test_key_path_rejects_markup() {
        assert!(KeyPath::new("title<script>").is_err());
    }

    #[test]
    fn test_key_path_deserialize_validates() {
        let ok: Result<KeyPath, _> = serde_json::from_str("\"a.b\"");
        assert!(ok.is_ok());
        let bad: Result<KeyPath, _> = serde_json::from_str("\"a b\"");
        assert!(bad.is_err());
    }
}
