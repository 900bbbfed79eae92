use std::sync::Arc;

use htn_worldstate::{Snapshot, WorldStateView};
use thiserror::Error;

/// A successful plan-step contribution: the successor snapshot the
/// search extends its chain with, plus the incremental cost.
#[derive(Debug)]
pub struct Contribution {
    pub next: Arc<Snapshot>,
    pub cost: u32,
}

/// Why a task declined to extend the plan. The display text is the
/// diagnostic reason the search records before backtracking. Always
/// recoverable: the search tries other branches.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanRejection {
    #[error("start location was invalid")]
    InvalidStart,
    #[error("target location was invalid")]
    InvalidGoal,
    #[error("plan-time test failed: {0}")]
    SimulationFailed(String),
    #[error("planning view was not bound to a snapshot")]
    NotPlanning,
}

/// The contract a task implements to extend a candidate plan: given a
/// read-only view over the current snapshot, either reject with a
/// reason or produce a sealed successor and a non-negative cost.
/// Rejection must be cheap: no fork, no cost, preconditions first.
pub trait TaskContribution {
    fn name(&self) -> &str;

    fn contribute(&self, view: &WorldStateView) -> Result<Contribution, PlanRejection>;
}

/// Cost law shared by movement-style tasks: `ceil(length × per_unit)`,
/// zero for non-positive lengths.
pub fn cost_from_length(length: f32, cost_per_unit_length: f32) -> u32 {
    if length <= 0.0 {
        return 0;
    }
    (length * cost_per_unit_length).ceil() as u32
}
