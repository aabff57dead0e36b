//! Per-type layer caps
//!
//! The check is advisory: callers evaluate it before creating a new root so
//! an over-limit create never reaches storage. Maxima come from
//! configuration; a type without a configured maximum is unlimited.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::decision::DecisionType;

#[derive(Debug, Error, PartialEq)]
pub enum LimitError {
    #[error("Layer limit reached for {decision_type}: {max} of {max} layers in use")]
    LayerLimitReached {
        decision_type: DecisionType,
        max: usize,
    },
}

/// Outcome of a layer cap check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerAllowance {
    pub allowed: bool,
    pub remaining: usize,
}

/// Compares the current layer count of a type against its maximum
pub fn can_create_layer(
    decision_type: DecisionType,
    current_count: usize,
    max_per_type: usize,
) -> LayerAllowance {
    let allowance = LayerAllowance {
        allowed: current_count < max_per_type,
        remaining: max_per_type.saturating_sub(current_count),
    };
    tracing::debug!(
        %decision_type,
        current_count,
        max_per_type,
        allowed = allowance.allowed,
        "layer cap check"
    );
    allowance
}

/// Configured maximum number of layers per type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerLimits(BTreeMap<DecisionType, usize>);

impl LayerLimits {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with_limit(mut self, decision_type: DecisionType, max: usize) -> Self {
        self.0.insert(decision_type, max);
        self
    }

    pub fn set(&mut self, decision_type: DecisionType, max: usize) {
        self.0.insert(decision_type, max);
    }

    pub fn max_for(&self, decision_type: DecisionType) -> Option<usize> {
        self.0.get(&decision_type).copied()
    }

    /// Allowance for one more layer, or `None` when the type is unlimited
    pub fn allowance(&self, decision_type: DecisionType, current_count: usize) -> Option<LayerAllowance> {
        self.max_for(decision_type)
            .map(|max| can_create_layer(decision_type, current_count, max))
    }

    /// Fails when a new layer of `decision_type` would exceed its maximum
    pub fn ensure(&self, decision_type: DecisionType, current_count: usize) -> Result<(), LimitError> {
        match self.max_for(decision_type) {
            Some(max) if !can_create_layer(decision_type, current_count, max).allowed => {
                Err(LimitError::LayerLimitReached { decision_type, max })
            }
            _ => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
