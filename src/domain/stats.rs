//! Aggregate counts over a decision set

use std::collections::BTreeMap;

use serde::Serialize;

use super::decision::{Decision, DecisionType, Urgency};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionStats {
    pub total: usize,
    pub by_type: BTreeMap<DecisionType, usize>,
    pub by_urgency: BTreeMap<Urgency, usize>,
    pub roots: usize,
    pub derived: usize,
}

impl Default for DecisionStats {
    fn default() -> Self {
        Self {
            total: 0,
            by_type: DecisionType::ALL.iter().map(|t| (*t, 0)).collect(),
            by_urgency: Urgency::ALL.iter().map(|u| (*u, 0)).collect(),
            roots: 0,
            derived: 0,
        }
    }
}

/// Counts decisions, optionally restricted to one type first
pub fn aggregate<'a>(
    decisions: impl IntoIterator<Item = &'a Decision>,
    filter: Option<DecisionType>,
) -> DecisionStats {
    decisions
        .into_iter()
        .filter(|d| filter.map_or(true, |t| d.decision_type == t))
        .fold(DecisionStats::default(), |mut stats, d| {
            stats.total += 1;
            *stats.by_type.entry(d.decision_type).or_default() += 1;
            *stats.by_urgency.entry(d.urgency).or_default() += 1;
            if d.is_root() {
                stats.roots += 1;
            } else {
                stats.derived += 1;
            }
            stats
        })
}
