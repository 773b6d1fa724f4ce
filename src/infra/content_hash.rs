//! Content hash used to detect changed files and drifted content.

use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// SHA256 of some content, as 64 lowercase hex characters.
///
/// File hashes are computed from raw bytes (before BOM stripping) so they
/// capture the exact state on disk. Body hashes are computed from text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    hex: String,
}

/// Errors when parsing a content hash from a hex string.
#[derive(Debug, Error)]
pub enum ContentHashError {
    #[error("invalid hex string: expected 64 hex characters, got {0} characters")]
    InvalidLength(usize),

    #[error("invalid hex character at position {position}: '{character}'")]
    InvalidCharacter { position: usize, character: char },
}

impl ContentHash {
    pub fn compute(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self {
            hex: format!("{:x}", digest),
        }
    }

    /// Hash of a text body.
    pub fn of_text(text: &str) -> Self {
        Self::compute(text.as_bytes())
    }

    /// Parses a stored hash, normalising to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `ContentHashError` unless the input is exactly 64 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, ContentHashError> {
        if hex.len() != 64 {
            return Err(ContentHashError::InvalidLength(hex.len()));
        }
        if let Some((position, character)) =
            hex.chars().enumerate().find(|(_, c)| !c.is_ascii_hexdigit())
        {
            return Err(ContentHashError::InvalidCharacter {
                position,
                character,
            });
        }
        Ok(Self {
            hex: hex.to_ascii_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}
