//! Hierarchy mutations: promote, reparent, delete
//!
//! Every operation validates against the whole snapshot before anything
//! changes, then returns a new [`DecisionSet`]. The input set is never
//! modified, and a failed operation leaves nothing behind.
//!
//! The `plan_*` variants return the [`StructuralChange`] that was validated
//! instead of applying it, so storage can persist exactly that change.

use std::collections::HashSet;

use thiserror::Error;

use super::id::{DecisionId, ProjectId};
use super::set::DecisionSet;

#[derive(Debug, Error, PartialEq)]
pub enum HierarchyError {
    #[error("Decision not found: {0}")]
    NotFound(DecisionId),

    #[error("Moving {decision} under {parent} would create a cycle")]
    Cycle {
        decision: DecisionId,
        parent: DecisionId,
    },

    #[error("Cannot delete {decision}: it has {} derived decision(s): {}", .children.len(), join_ids(.children))]
    HasChildren {
        decision: DecisionId,
        children: Vec<DecisionId>,
    },

    #[error("{decision} belongs to {project} but parent {parent} belongs to {parent_project}")]
    CrossProjectReference {
        decision: String,
        project: ProjectId,
        parent: DecisionId,
        parent_project: ProjectId,
    },
}

fn join_ids(ids: &[DecisionId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A validated change to the parent structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralChange {
    /// Set (or clear, with `None`) the parent of a decision
    SetParent {
        id: DecisionId,
        parent: Option<DecisionId>,
    },
    /// Remove a decision that has no children
    Remove { id: DecisionId },
}

impl StructuralChange {
    /// The decision the change applies to
    pub fn target(&self) -> &DecisionId {
        match self {
            StructuralChange::SetParent { id, .. } | StructuralChange::Remove { id } => id,
        }
    }
}

impl DecisionSet {
    /// Validates promoting a decision to a root
    ///
    /// Returns `None` when the decision is already a root.
    pub fn plan_promote(&self, id: &DecisionId) -> Result<Option<StructuralChange>, HierarchyError> {
        let decision = self
            .get(id)
            .ok_or_else(|| HierarchyError::NotFound(id.clone()))?;

        if decision.is_root() {
            return Ok(None);
        }

        Ok(Some(StructuralChange::SetParent {
            id: id.clone(),
            parent: None,
        }))
    }

    /// Validates moving a decision under `new_parent`
    ///
    /// Returns `None` when `new_parent` already is the parent.
    pub fn plan_reparent(
        &self,
        id: &DecisionId,
        new_parent: &DecisionId,
    ) -> Result<Option<StructuralChange>, HierarchyError> {
        let decision = self
            .get(id)
            .ok_or_else(|| HierarchyError::NotFound(id.clone()))?;

        if id == new_parent {
            return Err(HierarchyError::Cycle {
                decision: id.clone(),
                parent: new_parent.clone(),
            });
        }

        let parent = self
            .get(new_parent)
            .ok_or_else(|| HierarchyError::NotFound(new_parent.clone()))?;

        if parent.project_id != decision.project_id {
            return Err(HierarchyError::CrossProjectReference {
                decision: id.to_string(),
                project: decision.project_id.clone(),
                parent: new_parent.clone(),
                parent_project: parent.project_id.clone(),
            });
        }

        if decision.parent_id.as_ref() == Some(new_parent) {
            return Ok(None);
        }

        if self.ancestry_reaches(new_parent, id) {
            return Err(HierarchyError::Cycle {
                decision: id.clone(),
                parent: new_parent.clone(),
            });
        }

        Ok(Some(StructuralChange::SetParent {
            id: id.clone(),
            parent: Some(new_parent.clone()),
        }))
    }

    /// Validates deleting a decision; refused while anything derives from it
    pub fn plan_delete(&self, id: &DecisionId) -> Result<StructuralChange, HierarchyError> {
        if !self.contains(id) {
            return Err(HierarchyError::NotFound(id.clone()));
        }

        let children = self.children_ids(id);
        if !children.is_empty() {
            return Err(HierarchyError::HasChildren {
                decision: id.clone(),
                children,
            });
        }

        Ok(StructuralChange::Remove { id: id.clone() })
    }

    /// Validates `parent` as the parent of a new decision in `project`
    pub fn check_parent(&self, project: &ProjectId, parent: &DecisionId) -> Result<(), HierarchyError> {
        let decision = self
            .get(parent)
            .ok_or_else(|| HierarchyError::NotFound(parent.clone()))?;

        if &decision.project_id != project {
            return Err(HierarchyError::CrossProjectReference {
                decision: "new decision".to_string(),
                project: project.clone(),
                parent: parent.clone(),
                parent_project: decision.project_id.clone(),
            });
        }

        Ok(())
    }

    /// Returns a copy of this set with a validated change applied
    pub fn apply(&self, change: &StructuralChange) -> DecisionSet {
        let mut next = self.clone();
        match change {
            StructuralChange::SetParent { id, parent } => {
                if let Some(decision) = next.get_mut(id) {
                    decision.parent_id = parent.clone();
                }
            }
            StructuralChange::Remove { id } => {
                next.remove(id);
            }
        }
        tracing::debug!(target_id = %change.target(), ?change, "applied structural change");
        next
    }

    /// Makes a decision a root. Already-root decisions are left as they are.
    ///
    /// The decision keeps its `created_at`, so it can land before existing
    /// layers of its type.
    pub fn promote_to_root(&self, id: &DecisionId) -> Result<DecisionSet, HierarchyError> {
        Ok(match self.plan_promote(id)? {
            Some(change) => self.apply(&change),
            None => self.clone(),
        })
    }

    pub fn reparent(
        &self,
        id: &DecisionId,
        new_parent: &DecisionId,
    ) -> Result<DecisionSet, HierarchyError> {
        Ok(match self.plan_reparent(id, new_parent)? {
            Some(change) => self.apply(&change),
            None => self.clone(),
        })
    }

    pub fn delete(&self, id: &DecisionId) -> Result<DecisionSet, HierarchyError> {
        let change = self.plan_delete(id)?;
        Ok(self.apply(&change))
    }

    /// Walks parent links from `start`; true if `target` is reached
    ///
    /// A revisited node means the stored data already has a cycle, which is
    /// reported the same way.
    fn ancestry_reaches(&self, start: &DecisionId, target: &DecisionId) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if id == target || !visited.insert(id) {
                return true;
            }
            current = self.get(id).and_then(|d| d.parent_id.as_ref());
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{decision, id, in_project, OTHER_PROJECT};
    use crate::domain::DecisionType;

    /// A -> B -> C (C's parent is B, B's parent is A)
    fn chain() -> DecisionSet {
        vec![
            decision("d-00000a0", DecisionType::Focus, None, 1),
            decision("d-00000b0", DecisionType::Focus, Some("d-00000a0"), 2),
            decision("d-00000c0", DecisionType::Scope, Some("d-00000b0"), 3),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn reparent_into_descendant_is_a_cycle() {
        let set = chain();
        let result = set.reparent(&id("d-00000a0"), &id("d-00000c0"));

        assert_eq!(
            result,
            Err(HierarchyError::Cycle {
                decision: id("d-00000a0"),
                parent: id("d-00000c0"),
            })
        );
        assert_eq!(set, chain());
    }

    #[test]
    fn reparent_onto_self_is_a_cycle() {
        let set = chain();
        let result = set.reparent(&id("d-00000b0"), &id("d-00000b0"));

        assert!(matches!(result, Err(HierarchyError::Cycle { .. })));
    }

    #[test]
    fn reparent_moves_subtree() {
        let mut set = chain();
        set.insert(decision("d-00000d0", DecisionType::Focus, None, 4));

        let next = set.reparent(&id("d-00000b0"), &id("d-00000d0")).unwrap();

        assert_eq!(next.get(&id("d-00000b0")).unwrap().parent_id, Some(id("d-00000d0")));
        assert_eq!(set.get(&id("d-00000b0")).unwrap().parent_id, Some(id("d-00000a0")));
        // C still hangs off B
        assert_eq!(next.children_ids(&id("d-00000b0")), vec![id("d-00000c0")]);
    }

    #[test]
    fn reparent_to_current_parent_is_noop() {
        let set = chain();

        assert_eq!(set.plan_reparent(&id("d-00000c0"), &id("d-00000b0")), Ok(None));
        assert_eq!(set.reparent(&id("d-00000c0"), &id("d-00000b0")).unwrap(), set);
    }

    #[test]
    fn reparent_reports_missing_ids() {
        let set = chain();

        assert_eq!(
            set.reparent(&id("d-0000fff"), &id("d-00000a0")),
            Err(HierarchyError::NotFound(id("d-0000fff")))
        );
        assert_eq!(
            set.reparent(&id("d-00000c0"), &id("d-0000fff")),
            Err(HierarchyError::NotFound(id("d-0000fff")))
        );
    }

    #[test]
    fn reparent_across_projects_is_rejected() {
        let mut set = chain();
        set.insert(in_project(
            decision("d-00000e0", DecisionType::Focus, None, 5),
            OTHER_PROJECT,
        ));

        let result = set.reparent(&id("d-00000c0"), &id("d-00000e0"));
        assert!(matches!(
            result,
            Err(HierarchyError::CrossProjectReference { ref parent, .. }) if parent == &id("d-00000e0")
        ));
    }

    #[test]
    fn reparent_under_existing_corrupt_cycle_is_rejected() {
        let mut set = chain();
        // x <-> y loop that does not involve the target
        set.insert(decision("d-0000010", DecisionType::Scope, Some("d-0000011"), 6));
        set.insert(decision("d-0000011", DecisionType::Scope, Some("d-0000010"), 7));

        let result = set.reparent(&id("d-00000c0"), &id("d-0000010"));
        assert!(matches!(result, Err(HierarchyError::Cycle { .. })));
    }

    #[test]
    fn cross_type_parenting_is_allowed() {
        let mut set = chain();
        set.insert(decision("d-00000f0", DecisionType::Configuration, None, 8));

        let next = set.reparent(&id("d-00000c0"), &id("d-00000f0")).unwrap();
        assert_eq!(next.children_ids(&id("d-00000f0")), vec![id("d-00000c0")]);
    }

    #[test]
    fn promote_clears_parent_and_keeps_timestamp() {
        let mut set = chain();
        set.insert(decision("d-00000f1", DecisionType::Scope, None, 10));

        let next = set.promote_to_root(&id("d-00000c0")).unwrap();
        let promoted = next.get(&id("d-00000c0")).unwrap();
        assert!(promoted.is_root());
        assert_eq!(promoted.created_at, set.get(&id("d-00000c0")).unwrap().created_at);

        // Created at t=3, so it becomes the first scope layer, ahead of t=10
        let timeline = next.timeline();
        assert_eq!(
            timeline.layer_number(&id("d-00000c0")),
            Some((DecisionType::Scope, 1))
        );
        assert_eq!(
            timeline.layer_number(&id("d-00000f1")),
            Some((DecisionType::Scope, 2))
        );
    }

    #[test]
    fn promote_root_is_idempotent() {
        let set = chain();

        assert_eq!(set.plan_promote(&id("d-00000a0")), Ok(None));
        assert_eq!(set.promote_to_root(&id("d-00000a0")).unwrap(), set);
    }

    #[test]
    fn promote_missing_decision_fails() {
        assert_eq!(
            chain().promote_to_root(&id("d-0000fff")),
            Err(HierarchyError::NotFound(id("d-0000fff")))
        );
    }

    #[test]
    fn delete_guard() {
        let set: DecisionSet = vec![
            decision("d-00000a0", DecisionType::Focus, None, 1),
            decision("d-00000b0", DecisionType::Focus, Some("d-00000a0"), 2),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            set.delete(&id("d-00000a0")),
            Err(HierarchyError::HasChildren {
                decision: id("d-00000a0"),
                children: vec![id("d-00000b0")],
            })
        );

        let without_child = set.delete(&id("d-00000b0")).unwrap();
        let empty = without_child.delete(&id("d-00000a0")).unwrap();
        assert!(empty.is_empty());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn delete_missing_decision_fails() {
        assert_eq!(
            chain().delete(&id("d-0000fff")),
            Err(HierarchyError::NotFound(id("d-0000fff")))
        );
    }

    #[test]
    fn check_parent_for_new_decision() {
        let set = chain();
        let project = crate::domain::fixtures::PROJECT.parse().unwrap();
        let other: ProjectId = OTHER_PROJECT.parse().unwrap();

        assert!(set.check_parent(&project, &id("d-00000c0")).is_ok());
        assert_eq!(
            set.check_parent(&project, &id("d-0000fff")),
            Err(HierarchyError::NotFound(id("d-0000fff")))
        );
        assert!(matches!(
            set.check_parent(&other, &id("d-00000c0")),
            Err(HierarchyError::CrossProjectReference { .. })
        ));
    }

    #[test]
    fn errors_name_offending_ids() {
        let err = HierarchyError::HasChildren {
            decision: id("d-00000a0"),
            children: vec![id("d-00000b0"), id("d-00000c0")],
        };

        assert_eq!(
            err.to_string(),
            "Cannot delete d-00000a0: it has 2 derived decision(s): d-00000b0, d-00000c0"
        );
    }
}
