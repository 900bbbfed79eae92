use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque request describing the external work to start or re-issue.
/// The kind routes it inside the provider; the params are the task's
/// serialized request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskRequest {
    pub kind: String,
    pub params: Value,
}

impl SubtaskRequest {
    pub fn new(kind: impl Into<String>, params: Value) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// Provider-issued reference to one unit of externally scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubtaskHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskState {
    Active,
    Paused,
    Finished,
}

/// Boundary to whatever schedules long-running actions. The core only
/// drives this contract; a stuck subtask is bounded by its provider,
/// not by the execution machine.
pub trait SubtaskProvider {
    /// Starts new work, or updates `existing` in place when it is still
    /// live — at most one live subtask per occurrence. `None` when the
    /// request cannot be started.
    fn start_or_update(
        &mut self,
        existing: Option<SubtaskHandle>,
        request: SubtaskRequest,
    ) -> Option<SubtaskHandle>;

    fn cancel(&mut self, handle: SubtaskHandle);

    fn state(&self, handle: SubtaskHandle) -> SubtaskState;

    /// Success flag; meaningful once `state` reports `Finished`.
    fn outcome(&self, handle: SubtaskHandle) -> bool;

    /// Completion notifications since the last drain, delivered to the
    /// owning occurrences by the executor.
    fn drain_finished(&mut self) -> Vec<SubtaskHandle>;
}
