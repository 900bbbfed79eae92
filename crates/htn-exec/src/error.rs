use htn_plan::PlanStepId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("plan step {0} is already executing")]
    AlreadyActive(PlanStepId),
    #[error("plan step {0} is not executing")]
    NotActive(PlanStepId),
}
