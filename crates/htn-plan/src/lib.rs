//! Planning-side protocol: how a task contributes a step to a candidate
//! plan, and the identity that addresses one step occurrence.

pub mod contribution;
pub mod identity;
pub mod nav;

pub use contribution::{Contribution, PlanRejection, TaskContribution, cost_from_length};
pub use identity::PlanStepId;
pub use nav::{NavProvider, PathQuery, PathResult};
