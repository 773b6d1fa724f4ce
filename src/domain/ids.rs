//! ULID-based identifiers for documents and folders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use ulid::Ulid;

/// Error returned when parsing an invalid ULID string.
#[derive(Debug, Clone)]
pub struct ParseIdError {
    value: String,
    reason: String,
}

impl ParseIdError {
    /// Returns the invalid value that caused this error.
    pub fn invalid_value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ULID '{}': {}", self.value, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new identifier with the current timestamp.
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Creates an identifier from a specific datetime (useful for testing).
            pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
                let system_time: SystemTime = datetime.into();
                Self(Ulid::from_datetime(system_time))
            }

            /// Returns the 10-character timestamp prefix of the ULID.
            pub fn prefix(&self) -> String {
                self.0.to_string()[..10].to_string()
            }

            /// Returns the last 8 characters of the ULID, lowercased.
            ///
            /// These come from the random component, so two identifiers minted
            /// in the same millisecond still get different suffixes.
            pub fn short_suffix(&self) -> String {
                let full = self.0.to_string();
                full[full.len() - 8..].to_ascii_lowercase()
            }

            /// Returns true if the full identifier starts with `prefix` (case-insensitive).
            pub fn matches_prefix(&self, prefix: &str) -> bool {
                !prefix.is_empty()
                    && self
                        .0
                        .to_string()
                        .starts_with(&prefix.to_ascii_uppercase())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(\"{}\")", stringify!($name), self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ulid::from_string(s.trim())
                    .map($name)
                    .map_err(|e| ParseIdError {
                        value: s.to_string(),
                        reason: e.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

ulid_id!(
    /// Stable identifier of a document.
    ///
    /// Assigned once by the structured repository when the document is created
    /// and never reused. It is also written into every document file's
    /// front-matter, which is how a bare file is tied back to its document.
    DocumentId
);

ulid_id!(
    /// Stable identifier of a folder.
    FolderId
);
