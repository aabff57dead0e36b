//! Domain models and the decision timeline engine
//!
//! Contains the core logic without any I/O concerns. Every operation here
//! works on an in-memory snapshot and returns fresh derived values.

mod id;
mod decision;
mod project;
mod set;
mod timeline;
mod selector;
mod hierarchy;
mod limiter;
mod stats;
pub mod integrity;

#[cfg(test)]
mod fixtures;

pub use id::{DecisionId, IdError, ProjectId};
pub use decision::{Decision, DecisionPayload, DecisionType, NewDecision, Urgency};
pub use project::Project;
pub use set::DecisionSet;
pub use timeline::Timeline;
pub use selector::{all_layers_of, latest_layer_of, Layer};
pub use hierarchy::{HierarchyError, StructuralChange};
pub use limiter::{can_create_layer, LayerAllowance, LayerLimits, LimitError};
pub use stats::{aggregate, DecisionStats};
pub use integrity::IntegrityReport;
