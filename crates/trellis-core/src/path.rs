//! Dotted attribute key paths.

use std::fmt;

use crate::error::{Result, TrellisError};

/// A key into a nested attribute store, such as `address.city`.
///
/// Stored as segments so event channels can be keyed on the path itself and
/// no delimiter ever has to be re-parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// The empty path. Only meaningful as the root of a walk.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path, rejecting empty segments.
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(TrellisError::InvalidPath {
                path: path.to_string(),
                reason: "path is empty",
            });
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(TrellisError::InvalidPath {
                path: path.to_string(),
                reason: "path contains an empty segment",
            });
        }
        Ok(Self { segments })
    }

    /// Build a path from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, if any.
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Every strict prefix, innermost first: `a.b.c` yields `a.b`, then `a`.
    pub fn strict_prefixes(&self) -> impl Iterator<Item = KeyPath> + '_ {
        (1..self.segments.len()).rev().map(move |len| Self {
            segments: self.segments[..len].to_vec(),
        })
    }

    /// Whether `self` is `other` or lies underneath it.
    pub fn starts_with(&self, other: &KeyPath) -> bool {
        self.segments.starts_with(&other.segments)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Conversion used by every API that takes a key.
///
/// String keys are split on `.`. Empty segments are dropped here instead of
/// being rejected, because reactive lookups never fail; use
/// [`KeyPath::parse`] to validate untrusted input.
pub trait IntoKeyPath {
    fn into_key_path(self) -> KeyPath;
}

impl IntoKeyPath for KeyPath {
    fn into_key_path(self) -> KeyPath {
        self
    }
}

impl IntoKeyPath for &KeyPath {
    fn into_key_path(self) -> KeyPath {
        self.clone()
    }
}

impl IntoKeyPath for &str {
    fn into_key_path(self) -> KeyPath {
        KeyPath::from_segments(self.split('.').filter(|s| !s.is_empty()))
    }
}

impl IntoKeyPath for String {
    fn into_key_path(self) -> KeyPath {
        self.as_str().into_key_path()
    }
}

impl IntoKeyPath for &String {
    fn into_key_path(self) -> KeyPath {
        self.as_str().into_key_path()
    }
}

impl IntoKeyPath for &[&str] {
    fn into_key_path(self) -> KeyPath {
        KeyPath::from_segments(self.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = KeyPath::parse("a.b.c").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.leaf(), Some("c"));
        assert_eq!(path.to_string(), "a.b.c");
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(KeyPath::parse("").is_err());
        assert!(KeyPath::parse("a..b").is_err());
        assert!(KeyPath::parse(".a").is_err());
    }

    #[test]
    fn test_strict_prefixes_innermost_first() {
        let path = "a.b.c".into_key_path();
        let prefixes: Vec<String> = path.strict_prefixes().map(|p| p.to_string()).collect();
        assert_eq!(prefixes, vec!["a.b", "a"]);
        assert_eq!("a".into_key_path().strict_prefixes().count(), 0);
    }

    #[test]
    fn test_segments_containing_dots_stay_distinct() {
        let dotted = KeyPath::from_segments(["a.b"]);
        let nested = "a.b".into_key_path();
        assert_ne!(dotted, nested);
    }

    #[test]
    fn test_starts_with() {
        let path = "a.b.c".into_key_path();
        assert!(path.starts_with(&"a.b".into_key_path()));
        assert!(!path.starts_with(&"a.c".into_key_path()));
    }
}
