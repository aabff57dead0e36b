//! Identifiers for projects and decisions
//!
//! ID Format:
//! - Project IDs: `p-{7-char-hash}` (e.g., `p-3c9a1e0`)
//! - Decision IDs: `d-{7-char-hash}` (e.g., `d-7f2b4c1`)
//!
//! Hash is derived from title + creation timestamp. Ids are opaque to the
//! timeline engine; their lexical order only serves as a tie-break.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const HASH_LEN: usize = 7;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid project ID format: expected 'p-{{7-char-hash}}', got '{0}'")]
    InvalidProjectId(String),

    #[error("Invalid decision ID format: expected 'd-{{7-char-hash}}', got '{0}'")]
    InvalidDecisionId(String),
}

/// Generates a 7-character hash from title and timestamp
fn generate_hash(title: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", title, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..HASH_LEN].to_string()
}

/// Returns the hash part of `s` if it is `{prefix}{7 lowercase hex}`
fn parse_hash<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let hash = s.strip_prefix(prefix)?;
    let valid = hash.len() == HASH_LEN
        && hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    valid.then_some(hash)
}

/// Project ID in the format `p-{7-char-hash}`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId {
    hash: String,
}

impl ProjectId {
    /// Creates a new project ID from name and timestamp
    pub fn new(name: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            hash: generate_hash(name, timestamp),
        }
    }

    /// Returns the hash portion of the ID
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("p-{}", self.hash))
    }
}

impl FromStr for ProjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        parse_hash(s, "p-")
            .map(|hash| Self {
                hash: hash.to_string(),
            })
            .ok_or_else(|| IdError::InvalidProjectId(s.to_string()))
    }
}

impl TryFrom<String> for ProjectId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.to_string()
    }
}

/// Decision ID in the format `d-{7-char-hash}`
///
/// Ordering is lexical on the rendered form, which is what the timeline
/// uses to break `created_at` ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DecisionId {
    hash: String,
}

impl DecisionId {
    /// Creates a new decision ID from title and timestamp
    pub fn new(title: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            hash: generate_hash(title, timestamp),
        }
    }

    /// Returns the hash portion of the ID
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("d-{}", self.hash))
    }
}

impl FromStr for DecisionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        parse_hash(s, "d-")
            .map(|hash| Self {
                hash: hash.to_string(),
            })
            .ok_or_else(|| IdError::InvalidDecisionId(s.to_string()))
    }
}

impl TryFrom<String> for DecisionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DecisionId> for String {
    fn from(id: DecisionId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_to_column_width() {
        let decision: DecisionId = "d-1234567".parse().unwrap();
        let project: ProjectId = "p-abcdef0".parse().unwrap();

        assert_eq!(format!("{:<12}|", decision), "d-1234567   |");
        assert_eq!(format!("{:<12}|", project), "p-abcdef0   |");
        assert_eq!(decision.to_string(), "d-1234567");
    }

    #[test]
    fn decision_id_generation_is_unique_for_different_timestamps() {
        let title = "Same Title";
        let ts1 = Utc::now();
        let ts2 = ts1 + chrono::Duration::nanoseconds(1);

        assert_ne!(DecisionId::new(title, ts1), DecisionId::new(title, ts2));
    }

    #[test]
    fn decision_id_format_is_correct() {
        let s = DecisionId::new("Test", Utc::now()).to_string();

        assert!(s.starts_with("d-"));
        assert_eq!(s.len(), 9); // "d-" + 7 chars
    }

    #[test]
    fn decision_id_parses_correctly() {
        let original = DecisionId::new("Test", Utc::now());
        let parsed: DecisionId = original.to_string().parse().unwrap();

        assert_eq!(original, parsed);
    }

    #[test]
    fn decision_id_rejects_invalid_format() {
        assert!("invalid".parse::<DecisionId>().is_err());
        assert!("d-short".parse::<DecisionId>().is_err());
        assert!("d-toolonggg".parse::<DecisionId>().is_err());
        assert!("d-gggggg1".parse::<DecisionId>().is_err()); // 'g' is not hex
        assert!("d-ABCDEF1".parse::<DecisionId>().is_err()); // uppercase
        assert!("p-1234567".parse::<DecisionId>().is_err()); // wrong prefix
    }

    #[test]
    fn project_id_roundtrip() {
        let original = ProjectId::new("Harbor survey", Utc::now());
        let s = original.to_string();

        assert!(s.starts_with("p-"));
        assert_eq!(s.parse::<ProjectId>().unwrap(), original);
        assert!("d-1234567".parse::<ProjectId>().is_err());
    }

    #[test]
    fn decision_ids_order_lexically() {
        let a: DecisionId = "d-0000001".parse().unwrap();
        let b: DecisionId = "d-00000a0".parse().unwrap();

        assert!(a < b);
    }

    #[test]
    fn serde_uses_string_form() {
        let id: DecisionId = "d-abc1234".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"d-abc1234\"");
        assert_eq!(serde_json::from_str::<DecisionId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<DecisionId>("\"nope\"").is_err());
    }
}
