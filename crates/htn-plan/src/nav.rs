use htn_worldstate::Vec3;
use serde::{Deserialize, Serialize};

/// Plan-time path request. Synchronous from the caller's perspective;
/// whatever answers it must stay bounded on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathQuery {
    pub start: Vec3,
    pub goal: Vec3,
    pub allow_partial: bool,
}

/// Result of a successful path query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    /// Where the path actually ends; with partial paths this may differ
    /// from the requested goal.
    pub end: Vec3,
    pub length: f32,
    pub cost: f32,
    pub partial: bool,
}

/// Navigation boundary used for plan-time simulation. Implementations
/// must not mutate agent state and must not require the agent to be in
/// a runnable state.
pub trait NavProvider {
    /// `None` when no admissible path exists under the query settings.
    fn find_path(&self, query: &PathQuery) -> Option<PathResult>;

    /// Projects a point onto traversable surface within `extent`;
    /// `None` when nothing traversable is in range.
    fn project_point(&self, point: Vec3, extent: Vec3) -> Option<Vec3>;
}
