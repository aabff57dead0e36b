//! Timeline organizer
//!
//! Rebuilds the layer structure of a project from a flat decision snapshot:
//!
//! - `layers_by_type`: root decisions of each type in chronological order.
//!   A root's 1-based position is its layer number. Numbers are never
//!   stored, only computed here.
//! - `children_of`: a global parent -> children index over every derived
//!   decision, regardless of the type or root status of either side.
//!
//! The timeline borrows the snapshot and hands out shared references only.
//! Dangling parent references are indexed under the missing id; detecting
//! them is left to [`crate::domain::integrity`].

use std::collections::HashMap;

use super::decision::{Decision, DecisionType};
use super::id::DecisionId;

#[derive(Debug, Clone)]
pub struct Timeline<'a> {
    layers: HashMap<DecisionType, Vec<&'a Decision>>,
    children: HashMap<&'a DecisionId, Vec<&'a Decision>>,
    len: usize,
}

impl<'a> Timeline<'a> {
    /// Builds the timeline in one partition pass plus a sort per group
    pub fn build(decisions: impl IntoIterator<Item = &'a Decision>) -> Self {
        let mut layers: HashMap<DecisionType, Vec<&'a Decision>> = DecisionType::ALL
            .iter()
            .map(|t| (*t, Vec::new()))
            .collect();
        let mut children: HashMap<&'a DecisionId, Vec<&'a Decision>> = HashMap::new();
        let mut len = 0;

        for decision in decisions {
            len += 1;
            match &decision.parent_id {
                Some(parent) => children.entry(parent).or_default().push(decision),
                None => layers
                    .entry(decision.decision_type)
                    .or_default()
                    .push(decision),
            }
        }

        for group in layers.values_mut().chain(children.values_mut()) {
            group.sort_by(|a, b| a.chronological_cmp(b));
        }

        tracing::debug!(
            decisions = len,
            parents = children.len(),
            "built timeline"
        );

        Self {
            layers,
            children,
            len,
        }
    }

    /// Root decisions of a type, oldest first
    pub fn layers(&self, decision_type: DecisionType) -> &[&'a Decision] {
        self.layers
            .get(&decision_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn layers_by_type(&self) -> &HashMap<DecisionType, Vec<&'a Decision>> {
        &self.layers
    }

    pub fn layer_count(&self, decision_type: DecisionType) -> usize {
        self.layers(decision_type).len()
    }

    /// Returns the type and 1-based layer number of a root decision
    pub fn layer_number(&self, id: &DecisionId) -> Option<(DecisionType, usize)> {
        DecisionType::ALL.iter().find_map(|t| {
            self.layers(*t)
                .iter()
                .position(|d| &d.id == id)
                .map(|pos| (*t, pos + 1))
        })
    }

    /// Direct children of a decision, oldest first
    pub fn children(&self, id: &DecisionId) -> &[&'a Decision] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children_of(&self) -> &HashMap<&'a DecisionId, Vec<&'a Decision>> {
        &self.children
    }

    /// Every id that at least one decision names as its parent
    pub fn parent_keys(&self) -> impl Iterator<Item = &'a DecisionId> + '_ {
        self.children.keys().copied()
    }

    /// Number of decisions in the snapshot
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
