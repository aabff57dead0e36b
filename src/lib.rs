//! Strata CLI - decision layering and timeline engine
//!
//! Decisions of an investigation project are typed (focus, scope,
//! configuration). Root decisions form ordered layers per type and derived
//! decisions hang off a parent. The engine turns a flat snapshot into that
//! timeline, validates structural edits and enforces per-type layer limits.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{Decision, DecisionId, DecisionSet, DecisionType, ProjectId, Timeline, Urgency};
