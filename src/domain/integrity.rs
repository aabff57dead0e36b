//! Integrity check for stored decisions
//!
//! The timeline never rejects malformed input. This check is what callers
//! run when they want to know about it: parents that do not exist, parents
//! in another project, parent cycles and `created_at` ties that make layer
//! order depend on the id tie-break.
//!
//! Uses petgraph to find cycles in the parent graph.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use super::decision::Decision;
use super::id::{DecisionId, ProjectId};

/// A parent link that could not be honoured
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLink {
    pub decision: DecisionId,
    pub parent: DecisionId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Parent ids that match no decision in the snapshot
    pub dangling: Vec<BrokenLink>,
    /// Parents that live in a different project
    pub cross_project: Vec<BrokenLink>,
    /// Each entry is one cycle's members, sorted by id
    pub cycles: Vec<Vec<DecisionId>>,
    /// Same-project pairs sharing a `created_at`
    pub timestamp_ties: Vec<(DecisionId, DecisionId)>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty()
            && self.cross_project.is_empty()
            && self.cycles.is_empty()
            && self.timestamp_ties.is_empty()
    }

    /// Number of individual findings
    pub fn issue_count(&self) -> usize {
        self.dangling.len() + self.cross_project.len() + self.cycles.len() + self.timestamp_ties.len()
    }
}

/// Checks a snapshot. Never fails; every problem ends up in the report.
pub fn check<'a>(decisions: impl IntoIterator<Item = &'a Decision>) -> IntegrityReport {
    let mut decisions: Vec<&Decision> = decisions.into_iter().collect();
    decisions.sort_by(|a, b| a.chronological_cmp(b));

    let by_id: HashMap<&DecisionId, &Decision> = decisions.iter().map(|d| (&d.id, *d)).collect();
    let mut report = IntegrityReport::default();

    let mut graph: DiGraph<&DecisionId, ()> = DiGraph::new();
    let nodes: HashMap<&DecisionId, NodeIndex> = decisions
        .iter()
        .map(|d| (&d.id, graph.add_node(&d.id)))
        .collect();

    for decision in &decisions {
        let Some(parent_id) = &decision.parent_id else {
            continue;
        };

        match by_id.get(parent_id) {
            None => report.dangling.push(BrokenLink {
                decision: decision.id.clone(),
                parent: parent_id.clone(),
            }),
            Some(parent) => {
                if parent.project_id != decision.project_id {
                    report.cross_project.push(BrokenLink {
                        decision: decision.id.clone(),
                        parent: parent_id.clone(),
                    });
                }
                graph.add_edge(nodes[&decision.id], nodes[parent_id], ());
            }
        }
    }

    for component in tarjan_scc(&graph) {
        let is_cycle = component.len() > 1
            || component
                .first()
                .is_some_and(|n| graph.find_edge(*n, *n).is_some());
        if is_cycle {
            let mut members: Vec<DecisionId> =
                component.iter().map(|n| graph[*n].clone()).collect();
            members.sort();
            report.cycles.push(members);
        }
    }
    report.cycles.sort();

    let mut last_seen: HashMap<&ProjectId, &Decision> = HashMap::new();
    for decision in &decisions {
        if let Some(previous) = last_seen.insert(&decision.project_id, decision) {
            if previous.created_at == decision.created_at {
                report
                    .timestamp_ties
                    .push((previous.id.clone(), decision.id.clone()));
            }
        }
    }

    if !report.is_clean() {
        tracing::warn!(
            dangling = report.dangling.len(),
            cross_project = report.cross_project.len(),
            cycles = report.cycles.len(),
            timestamp_ties = report.timestamp_ties.len(),
            "integrity check found problems"
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{decision, id, in_project, OTHER_PROJECT};
    use crate::domain::DecisionType;

    #[test]
    fn clean_snapshot() {
        let decisions = vec![
            decision("d-0000001", DecisionType::Focus, None, 1),
            decision("d-0000002", DecisionType::Scope, Some("d-0000001"), 2),
        ];

        let report = check(&decisions);
        assert!(report.is_clean());
        assert_eq!(report.issue_count(), 0);
    }

    #[test]
    fn finds_dangling_parent() {
        let decisions = vec![decision("d-0000001", DecisionType::Focus, Some("d-fffffff"), 1)];

        let report = check(&decisions);
        assert_eq!(
            report.dangling,
            vec![BrokenLink {
                decision: id("d-0000001"),
                parent: id("d-fffffff"),
            }]
        );
    }

    #[test]
    fn finds_cross_project_parent() {
        let decisions = vec![
            in_project(decision("d-0000001", DecisionType::Focus, None, 1), OTHER_PROJECT),
            decision("d-0000002", DecisionType::Focus, Some("d-0000001"), 2),
        ];

        let report = check(&decisions);
        assert_eq!(report.cross_project.len(), 1);
        assert_eq!(report.cross_project[0].decision, id("d-0000002"));
    }

    #[test]
    fn finds_cycles_and_self_parenting() {
        let decisions = vec![
            decision("d-0000001", DecisionType::Focus, Some("d-0000003"), 1),
            decision("d-0000002", DecisionType::Focus, Some("d-0000001"), 2),
            decision("d-0000003", DecisionType::Focus, Some("d-0000002"), 3),
            decision("d-0000009", DecisionType::Scope, Some("d-0000009"), 4),
            decision("d-000000a", DecisionType::Scope, None, 5),
        ];

        let report = check(&decisions);
        assert_eq!(
            report.cycles,
            vec![
                vec![id("d-0000001"), id("d-0000002"), id("d-0000003")],
                vec![id("d-0000009")],
            ]
        );
    }

    #[test]
    fn finds_timestamp_ties_within_a_project() {
        let decisions = vec![
            decision("d-0000001", DecisionType::Focus, None, 7),
            decision("d-0000002", DecisionType::Scope, None, 7),
            in_project(decision("d-0000003", DecisionType::Scope, None, 7), OTHER_PROJECT),
        ];

        let report = check(&decisions);
        assert_eq!(
            report.timestamp_ties,
            vec![(id("d-0000001"), id("d-0000002"))]
        );
    }
}
