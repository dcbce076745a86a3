// ABOUTME: Validated changeset identifier and changeset metadata.
// ABOUTME: Identifiers are lowercase hex revision ids, full or abbreviated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Longest identifier accepted; covers 256-bit content hashes.
const MAX_LEN: usize = 64;

/// Length of the abbreviated form used in log lines.
const SHORT_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChangesetIdError {
    #[error("changeset id cannot be empty")]
    Empty,

    #[error("changeset id exceeds maximum length of {MAX_LEN} characters")]
    TooLong,

    #[error("changeset id must be lowercase hex")]
    NotLowercase,

    #[error("invalid character in changeset id: '{0}'")]
    InvalidChar(char),
}

/// An immutable identifier for a specific state of versioned source code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangesetId(String);

impl ChangesetId {
    pub fn new(value: &str) -> Result<Self, ChangesetIdError> {
        if value.is_empty() {
            return Err(ChangesetIdError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(ChangesetIdError::TooLong);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(ChangesetIdError::NotLowercase);
            }
            if !c.is_ascii_hexdigit() {
                return Err(ChangesetIdError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines and progress output.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(SHORT_LEN)]
    }
}

impl fmt::Display for ChangesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ChangesetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChangesetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        ChangesetId::new(&value).map_err(serde::de::Error::custom)
    }
}

/// A changeset resolved from the deployment repository: the identifier plus
/// whatever metadata the source-control backend reported for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Changeset {
    pub id: ChangesetId,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Changeset {
    pub fn new(id: ChangesetId) -> Self {
        Self {
            id,
            author: None,
            message: None,
            timestamp: None,
        }
    }
}
