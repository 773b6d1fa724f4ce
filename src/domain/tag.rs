//! Flat, case-insensitive document tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A case-insensitive tag attached to a document.
///
/// Tags are normalised to lowercase, so `Draft` and `draft` are the same tag.
/// The index store keeps them as a flat, denormalised list per record.
///
/// ```
/// use quire::domain::Tag;
///
/// let tag = Tag::new(" Draft ").unwrap();
/// assert_eq!(tag.as_str(), "draft");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

/// Error returned when parsing an invalid tag.
#[derive(Debug, Clone)]
pub struct ParseTagError(String);

impl fmt::Display for ParseTagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseTagError {}

impl Tag {
    /// Creates a tag, trimming and lowercasing the input.
    ///
    /// # Errors
    ///
    /// Returns `ParseTagError` for empty input or characters other than
    /// alphanumerics, hyphens and underscores.
    pub fn new(s: &str) -> Result<Self, ParseTagError> {
        let normalized = s.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(ParseTagError("tag cannot be empty".to_string()));
        }

        if !normalized
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ParseTagError(format!(
                "invalid tag '{}': tags must contain only alphanumeric characters, hyphens, and underscores",
                normalized
            )));
        }

        Ok(Self(normalized))
    }

    /// Returns the normalised tag value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag(\"{}\")", self.0)
    }
}

impl FromStr for Tag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sorts and removes duplicate tags.
pub(crate) fn normalize_tags(mut tags: Vec<Tag>) -> Vec<Tag> {
    tags.sort();
    tags.dedup();
    tags
}
