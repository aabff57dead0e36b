//! Decision builders shared by the domain unit tests

use chrono::{DateTime, TimeZone, Utc};

use super::decision::{Decision, DecisionPayload, DecisionType, Urgency};
use super::id::{DecisionId, ProjectId};

pub const PROJECT: &str = "p-0000001";
pub const OTHER_PROJECT: &str = "p-0000002";

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

pub fn id(s: &str) -> DecisionId {
    s.parse().unwrap()
}

/// Builds a decision in [`PROJECT`] created `seconds` after a fixed epoch
pub fn decision(
    decision_id: &str,
    decision_type: DecisionType,
    parent: Option<&str>,
    seconds: i64,
) -> Decision {
    Decision {
        id: id(decision_id),
        project_id: PROJECT.parse().unwrap(),
        decision_type,
        parent_id: parent.map(id),
        created_at: at(seconds),
        updated_at: at(seconds),
        urgency: Urgency::Medium,
        title: format!("Decision {}", decision_id),
        description: None,
        payload: DecisionPayload::new(),
    }
}

pub fn in_project(mut decision: Decision, project: &str) -> Decision {
    decision.project_id = project.parse::<ProjectId>().unwrap();
    decision
}

pub fn with_urgency(mut decision: Decision, urgency: Urgency) -> Decision {
    decision.urgency = urgency;
    decision
}
