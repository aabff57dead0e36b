//! In-memory decision snapshot
//!
//! Decisions are kept in a flat map keyed by id; parent links are plain id
//! references resolved through the map.

use std::collections::HashMap;

use super::decision::Decision;
use super::id::DecisionId;
use super::timeline::Timeline;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionSet {
    decisions: HashMap<DecisionId, Decision>,
}

impl DecisionSet {
    pub fn new() -> Self {
        Self {
            decisions: HashMap::new(),
        }
    }

    /// Adds or replaces a decision
    pub fn insert(&mut self, decision: Decision) {
        self.decisions.insert(decision.id.clone(), decision);
    }

    pub fn get(&self, id: &DecisionId) -> Option<&Decision> {
        self.decisions.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &DecisionId) -> Option<&mut Decision> {
        self.decisions.get_mut(id)
    }

    pub(crate) fn remove(&mut self, id: &DecisionId) -> Option<Decision> {
        self.decisions.remove(id)
    }

    pub fn contains(&self, id: &DecisionId) -> bool {
        self.decisions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Iterates in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.values()
    }

    /// Decisions whose parent is `id`, oldest first
    pub fn children_ids(&self, id: &DecisionId) -> Vec<DecisionId> {
        let mut children: Vec<&Decision> = self
            .decisions
            .values()
            .filter(|d| d.parent_id.as_ref() == Some(id))
            .collect();
        children.sort_by(|a, b| a.chronological_cmp(b));
        children.into_iter().map(|d| d.id.clone()).collect()
    }

    /// Builds the timeline of this snapshot
    pub fn timeline(&self) -> Timeline<'_> {
        Timeline::build(self.decisions.values())
    }

    /// All decisions in timeline order
    pub fn into_sorted_vec(self) -> Vec<Decision> {
        let mut decisions: Vec<_> = self.decisions.into_values().collect();
        decisions.sort_by(|a, b| a.chronological_cmp(b));
        decisions
    }
}

impl FromIterator<Decision> for DecisionSet {
    fn from_iter<I: IntoIterator<Item = Decision>>(iter: I) -> Self {
        let mut set = Self::new();
        for decision in iter {
            set.insert(decision);
        }
        set
    }
}

impl<'a> IntoIterator for &'a DecisionSet {
    type Item = &'a Decision;
    type IntoIter = std::collections::hash_map::Values<'a, DecisionId, Decision>;

    fn into_iter(self) -> Self::IntoIter {
        self.decisions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{decision, id};
    use crate::domain::DecisionType;

    #[test]
    fn collects_and_looks_up() {
        let set: DecisionSet = vec![
            decision("d-0000001", DecisionType::Focus, None, 1),
            decision("d-0000002", DecisionType::Focus, Some("d-0000001"), 2),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
        assert!(set.contains(&id("d-0000002")));
        assert_eq!(set.children_ids(&id("d-0000001")), vec![id("d-0000002")]);
        assert!(set.children_ids(&id("d-0000002")).is_empty());
    }

    #[test]
    fn sorted_vec_follows_timeline_order() {
        let set: DecisionSet = vec![
            decision("d-0000002", DecisionType::Scope, None, 9),
            decision("d-0000001", DecisionType::Focus, None, 3),
        ]
        .into_iter()
        .collect();

        let ids: Vec<_> = set.into_sorted_vec().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![id("d-0000001"), id("d-0000002")]);
    }
}
