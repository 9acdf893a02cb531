//! Hashtag value type

use std::fmt;

use serde::Serialize;

/// Marker character stripped from the front of a tag
const TAG_MARKER: char = '#';

/// A normalized hashtag (no leading `#`)
///
/// Equality and hashing are by the tag string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Hashtag(String);

impl Hashtag {
    /// Create a hashtag, stripping a single leading marker if present
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        match tag.strip_prefix(TAG_MARKER) {
            Some(stripped) => Self(stripped.to_string()),
            None => Self(tag),
        }
    }

    /// The tag text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hashtag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<&str> for Hashtag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl AsRef<str> for Hashtag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
