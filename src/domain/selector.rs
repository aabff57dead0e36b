//! Layer views derived from a [`Timeline`]
//!
//! Both views are pure functions of the timeline and keep no state.

use serde::Serialize;

use super::decision::{Decision, DecisionType};
use super::timeline::Timeline;

/// A root decision with its 1-based layer number and direct children
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Layer<'t> {
    pub number: usize,
    pub decision: &'t Decision,
    pub children: &'t [&'t Decision],
}

/// The most recently created root of `decision_type`, if any
pub fn latest_layer_of<'t>(
    timeline: &'t Timeline<'_>,
    decision_type: DecisionType,
) -> Option<Layer<'t>> {
    let layers = timeline.layers(decision_type);
    let decision = *layers.last()?;

    Some(Layer {
        number: layers.len(),
        decision,
        children: timeline.children(&decision.id),
    })
}

/// The full thread of one type, oldest layer first
///
/// Without a type filter the result is empty: threads of different types
/// are never interleaved.
pub fn all_layers_of<'t>(
    timeline: &'t Timeline<'_>,
    filter: Option<DecisionType>,
) -> Vec<Layer<'t>> {
    let Some(decision_type) = filter else {
        return Vec::new();
    };

    timeline
        .layers(decision_type)
        .iter()
        .enumerate()
        .map(|(i, &decision)| Layer {
            number: i + 1,
            decision,
            children: timeline.children(&decision.id),
        })
        .collect()
}
