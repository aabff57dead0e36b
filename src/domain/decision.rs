//! Decision domain model
//!
//! Decisions are the records the timeline engine works on. A decision with no
//! parent is a root and forms a layer for its type; a decision with a parent
//! is derived. The engine only reads the structural fields (`id`,
//! `project_id`, `decision_type`, `parent_id`, `created_at`) and `urgency`
//! for statistics. Everything else is opaque content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::id::{DecisionId, ProjectId};

/// Kind of decision. Closed set; immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionType {
    Focus,
    Scope,
    Configuration,
}

impl DecisionType {
    /// Every decision type, in display order
    pub const ALL: [DecisionType; 3] = [
        DecisionType::Focus,
        DecisionType::Scope,
        DecisionType::Configuration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::Focus => "focus",
            DecisionType::Scope => "scope",
            DecisionType::Configuration => "configuration",
        }
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DecisionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "focus" => Ok(DecisionType::Focus),
            "scope" => Ok(DecisionType::Scope),
            "configuration" | "config" => Ok(DecisionType::Configuration),
            _ => Err(format!(
                "Invalid decision type: {} (expected focus, scope or configuration)",
                s
            )),
        }
    }
}

/// Urgency of a decision. Only used for aggregate statistics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [
        Urgency::Low,
        Urgency::Medium,
        Urgency::High,
        Urgency::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            "critical" => Ok(Urgency::Critical),
            _ => Err(format!("Invalid urgency: {}", s)),
        }
    }
}

/// Type-specific payload - extensible key-value pairs the engine never reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionPayload(HashMap<String, serde_json::Value>);

impl DecisionPayload {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

/// A decision recorded in an investigation project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Unique identifier, assigned by storage
    pub id: DecisionId,

    /// Owning project
    pub project_id: ProjectId,

    /// Decision type
    #[serde(rename = "type")]
    pub decision_type: DecisionType,

    /// Parent decision; `None` marks a root (a layer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<DecisionId>,

    /// Creation time, assigned by storage. The only ordering key.
    pub created_at: DateTime<Utc>,

    /// When content fields were last edited
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub urgency: Urgency,

    /// Human-readable title
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "DecisionPayload::is_empty")]
    pub payload: DecisionPayload,
}

impl Decision {
    /// Materializes a draft with the id and timestamp assigned by storage
    pub fn from_draft(draft: NewDecision, id: DecisionId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            project_id: draft.project_id,
            decision_type: draft.decision_type,
            parent_id: draft.parent_id,
            created_at,
            updated_at: created_at,
            urgency: draft.urgency,
            title: draft.title,
            description: draft.description,
            payload: draft.payload,
        }
    }

    /// Returns true if this decision forms a layer (has no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Returns true if this decision hangs off another decision
    pub fn is_derived(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Timeline order: `created_at` ascending, ties broken by id
    pub fn chronological_cmp(&self, other: &Decision) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
        self.updated_at = Utc::now();
    }

    pub fn set_urgency(&mut self, urgency: Urgency) {
        if self.urgency != urgency {
            self.urgency = urgency;
            self.updated_at = Utc::now();
        }
    }

    pub fn set_payload(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.payload.set(key, value);
        self.updated_at = Utc::now();
    }
}

/// A decision that has not been written yet
///
/// Storage assigns `id` and `created_at` when it persists the draft.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDecision {
    pub project_id: ProjectId,
    pub decision_type: DecisionType,
    pub parent_id: Option<DecisionId>,
    pub urgency: Urgency,
    pub title: String,
    pub description: Option<String>,
    pub payload: DecisionPayload,
}

impl NewDecision {
    /// Creates a root draft with default urgency
    pub fn new(project_id: ProjectId, decision_type: DecisionType, title: impl Into<String>) -> Self {
        Self {
            project_id,
            decision_type,
            parent_id: None,
            urgency: Urgency::default(),
            title: title.into(),
            description: None,
            payload: DecisionPayload::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: DecisionId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
