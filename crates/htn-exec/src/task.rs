use htn_plan::PlanStepId;
use htn_worldstate::WorldKey;

use crate::executor::ExecContext;

/// Outcome reported by a plan-step execution hook. `InProgress` means
/// the step stays latent and finishes later through a completion or
/// observer signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    InProgress,
    Succeeded,
    Failed,
    Aborted,
}

impl TaskResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskResult::InProgress)
    }
}

/// Externally visible status of one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Active,
    Inactive,
}

/// A plan step wrapping a long-running external action. All hooks run
/// with exclusive access to the occurrence's node memory; the executor
/// has already validated the occurrence identity before dispatching
/// `on_key_changed`.
pub trait LatentTask {
    fn name(&self) -> &str;

    /// Starts the occurrence. Returning a terminal result finishes the
    /// step immediately; `InProgress` leaves it latent.
    fn execute(&self, cx: &mut ExecContext<'_>, id: &PlanStepId) -> TaskResult;

    /// Reaction to a change of an observed live key. Returning a
    /// terminal result finishes the step.
    fn on_key_changed(&self, cx: &mut ExecContext<'_>, id: &PlanStepId, key: &WorldKey)
    -> TaskResult {
        let _ = (cx, id, key);
        TaskResult::InProgress
    }

    /// Called once with the final result before node memory is torn
    /// down; abort-specific cleanup (subtask cancellation) goes here.
    fn on_finished(&self, cx: &mut ExecContext<'_>, id: &PlanStepId, result: TaskResult) {
        let _ = (cx, id, result);
    }
}
