use std::rc::Rc;

use htn_exec::{ExecContext, LatentTask, SubtaskRequest, SubtaskState, TaskResult};
use htn_plan::{
    Contribution, NavProvider, PathQuery, PlanRejection, PlanStepId, TaskContribution,
    cost_from_length,
};
use htn_worldstate::{ObjectLocator, Vec3, WorldKey, WorldStateView, build_next};
use serde::{Deserialize, Serialize};

/// Subtask kind the movement task issues to its provider.
pub const MOVE_SUBTASK_KIND: &str = "move";

/// Payload of a movement subtask, serialized into the request params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub goal: Vec3,
    pub acceptance_radius: f32,
    pub allow_partial: bool,
    pub track_moving_goal: bool,
}

use crate::config::MoveConfig;

/// Movement plan step. At plan time it simulates the leg against the
/// navigation boundary and advances the agent's projected location in
/// the successor snapshot; at execution time it drives one latent move
/// subtask, re-issuing it when an observed goal moves beyond the
/// configured tolerance.
pub struct MoveToTask {
    goal_key: WorldKey,
    config: MoveConfig,
    nav: Rc<dyn NavProvider>,
    locator: Option<Rc<dyn ObjectLocator>>,
}

impl MoveToTask {
    pub fn new(goal_key: WorldKey, config: MoveConfig, nav: Rc<dyn NavProvider>) -> Self {
        Self {
            goal_key,
            config,
            nav,
            locator: None,
        }
    }

    /// Locator used to resolve an object-valued goal key to a location.
    pub fn with_locator(mut self, locator: Rc<dyn ObjectLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn goal_key(&self) -> &WorldKey {
        &self.goal_key
    }

    fn locator(&self) -> Option<&dyn ObjectLocator> {
        self.locator.as_deref()
    }

    fn projection_extent(&self) -> Vec3 {
        Vec3::new(
            self.config.agent_radius * 2.0,
            self.config.agent_radius * 2.0,
            self.config.agent_half_height * 2.0,
        )
    }

    /// Starts or re-targets the latent move subtask. The finish guard
    /// stays down for the whole exchange so a queued completion of the
    /// old request cannot finalize the step mid-swap.
    fn issue_move(&self, cx: &mut ExecContext<'_>, goal: Vec3) -> TaskResult {
        cx.memory.observer_can_finish = false;
        let request = MoveRequest {
            goal,
            acceptance_radius: self.config.acceptance_radius,
            allow_partial: self.config.allow_partial_result,
            track_moving_goal: self.config.track_moving_goal,
        };
        let params = match serde_json::to_value(&request) {
            Ok(params) => params,
            Err(err) => {
                log::error!("move request for '{}' did not serialize: {err}", self.goal_key);
                return TaskResult::Failed;
            }
        };
        let handle = cx
            .provider
            .start_or_update(cx.memory.subtask, SubtaskRequest::new(MOVE_SUBTASK_KIND, params));
        let Some(handle) = handle else {
            log::warn!("move subtask toward '{}' could not start", self.goal_key);
            return TaskResult::Failed;
        };
        cx.memory.subtask = Some(handle);
        cx.memory.previous_goal = goal;
        cx.memory.observer_can_finish = true;
        // A provider may finish the request during setup; in that case
        // the occurrence terminates here instead of staying latent.
        if cx.provider.state(handle) == SubtaskState::Finished {
            return if cx.provider.outcome(handle) {
                TaskResult::Succeeded
            } else {
                TaskResult::Failed
            };
        }
        TaskResult::InProgress
    }
}

impl TaskContribution for MoveToTask {
    fn name(&self) -> &str {
        "move_to"
    }

    fn contribute(&self, view: &WorldStateView) -> Result<Contribution, PlanRejection> {
        let parent = view.snapshot().ok_or(PlanRejection::NotPlanning)?;
        let start = view.self_location();
        if !start.is_valid() {
            return Err(PlanRejection::InvalidStart);
        }
        let goal = view.location_of(&self.goal_key, self.locator());
        if !goal.is_valid() {
            return Err(PlanRejection::InvalidGoal);
        }

        let (end, cost) = if self.config.test_path_during_planning {
            let path = self
                .nav
                .find_path(&PathQuery {
                    start,
                    goal,
                    allow_partial: self.config.allow_partial_result,
                })
                .ok_or_else(|| {
                    PlanRejection::SimulationFailed("no admissible path to the goal".into())
                })?;
            let cost = if self.config.use_cost_instead_of_length {
                cost_from_length(path.cost, 1.0)
            } else {
                cost_from_length(path.length, self.config.cost_per_unit_length)
            };
            (path.end, cost)
        } else {
            // Cheap estimate: project the goal onto the surface when
            // possible, keep the raw goal otherwise. An estimate is
            // still required either way.
            let goal = if self.config.project_goal {
                self.nav
                    .project_point(goal, self.projection_extent())
                    .unwrap_or(goal)
            } else {
                goal
            };
            (goal, cost_from_length(start.distance(goal), self.config.cost_per_unit_length))
        };

        // Path ends lie on the surface; the agent's location is its
        // capsule center.
        let projected = end.with_z_offset(self.config.agent_half_height);
        let next = build_next(&parent, |draft| {
            draft.set_vector(WorldKey::self_location(), projected);
        });
        Ok(Contribution { next, cost })
    }
}

impl LatentTask for MoveToTask {
    fn name(&self) -> &str {
        "move_to"
    }

    fn execute(&self, cx: &mut ExecContext<'_>, id: &PlanStepId) -> TaskResult {
        let view = cx.view();
        let goal = view.location_of(&self.goal_key, self.locator());
        if !goal.is_valid() {
            log::warn!("{id}: goal '{}' has no valid location", self.goal_key);
            return TaskResult::Failed;
        }
        let here = view.self_location();
        if here.is_valid() && here.distance(goal) <= self.config.acceptance_radius {
            return TaskResult::Succeeded;
        }

        let result = self.issue_move(cx, goal);
        if result != TaskResult::InProgress {
            return result;
        }

        if self.config.observe_goal {
            if let Some(stale) = cx.memory.observer.take() {
                log::warn!("{id}: goal observer was already registered, re-registering");
                cx.unsubscribe(stale);
            }
            let handle = cx.subscribe(self.goal_key.clone());
            cx.memory.observer = Some(handle);
        }
        TaskResult::InProgress
    }

    fn on_key_changed(
        &self,
        cx: &mut ExecContext<'_>,
        id: &PlanStepId,
        key: &WorldKey,
    ) -> TaskResult {
        let view = cx.view();
        let goal = view.location_of(key, self.locator());
        if !goal.is_valid() {
            log::warn!("{id}: observed goal '{key}' became invalid");
            return TaskResult::Failed;
        }
        // The tolerance only applies to location-valued keys; a changed
        // object reference always re-targets the move.
        if view.get_vector(key).is_valid() {
            let previous = cx.memory.previous_goal;
            if previous.is_valid()
                && goal.distance(previous) <= self.config.observe_tolerance_radius
            {
                return TaskResult::InProgress;
            }
        }
        self.issue_move(cx, goal)
    }

    fn on_finished(&self, cx: &mut ExecContext<'_>, id: &PlanStepId, result: TaskResult) {
        if result == TaskResult::Aborted {
            cx.memory.observer_can_finish = false;
            match cx.memory.subtask {
                Some(handle) => {
                    log::debug!("{id}: aborting, cancelling the in-flight move");
                    cx.provider.cancel(handle);
                }
                None => log::warn!("{id}: aborted with no move subtask to cancel"),
            }
        }
        cx.memory.subtask = None;
    }
}
