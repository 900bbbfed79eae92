use std::fmt;

/// Addresses one occurrence of a task within one plan. The same task
/// class may appear many times; the occurrence index disambiguates
/// them, and asynchronous callbacks validate against this identity
/// before touching any per-occurrence state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanStepId {
    pub task: String,
    pub occurrence: u32,
}

impl PlanStepId {
    pub fn new(task: impl Into<String>, occurrence: u32) -> Self {
        Self {
            task: task.into(),
            occurrence,
        }
    }
}

impl fmt::Display for PlanStepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.task, self.occurrence)
    }
}
