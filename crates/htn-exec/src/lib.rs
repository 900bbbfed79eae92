//! Execution-time machinery: per-occurrence node memory, the latent
//! subtask boundary, and the executor that drives latent tasks against
//! the live store on a single-threaded cooperative cadence.

pub mod error;
pub mod executor;
pub mod memory;
pub mod service;
pub mod subtask;
pub mod task;

pub use error::ExecError;
pub use executor::{ExecContext, TaskExecutor};
pub use memory::{MemoryArena, NodeMemory};
pub use service::{PlanService, ServiceSchedule, ServiceScheduler};
pub use subtask::{SubtaskHandle, SubtaskProvider, SubtaskRequest, SubtaskState};
pub use task::{LatentTask, TaskResult, TaskStatus};
