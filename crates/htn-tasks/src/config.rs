use serde::{Deserialize, Serialize};

/// Tuning surface of the movement task. Deserialized from agent
/// configuration; every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveConfig {
    /// Run a real path query during planning instead of assuming the
    /// goal is reachable.
    pub test_path_during_planning: bool,
    /// Charge the navigation cost of the simulated path rather than
    /// its scaled length.
    pub use_cost_instead_of_length: bool,
    /// Scale applied to path length when deriving the plan cost.
    pub cost_per_unit_length: f32,
    /// Accept a path that stops short of the goal.
    pub allow_partial_result: bool,
    /// Distance at which the move counts as arrived.
    pub acceptance_radius: f32,
    /// Subscribe to the goal key and react when it changes mid-move.
    pub observe_goal: bool,
    /// Goal movement below this distance is ignored by the observer.
    /// Defaults to 95% of the acceptance radius.
    pub observe_tolerance_radius: f32,
    /// Ask the subtask to keep following a goal that moves.
    pub track_moving_goal: bool,
    /// Project the goal onto the navigable surface before planning.
    pub project_goal: bool,
    /// Agent capsule, used as the projection extent and for the
    /// half-height adjustment of surface locations.
    pub agent_radius: f32,
    pub agent_half_height: f32,
}

impl Default for MoveConfig {
    fn default() -> Self {
        Self {
            test_path_during_planning: true,
            use_cost_instead_of_length: false,
            cost_per_unit_length: 1.0,
            allow_partial_result: false,
            acceptance_radius: 5.0,
            observe_goal: false,
            observe_tolerance_radius: 5.0 * 0.95,
            track_moving_goal: true,
            project_goal: true,
            agent_radius: 35.0,
            agent_half_height: 90.0,
        }
    }
}
