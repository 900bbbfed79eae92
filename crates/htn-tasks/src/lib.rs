//! Concrete plan steps built on the world-state protocol. Currently the
//! movement task and its configuration surface.

pub mod config;
pub mod move_to;

pub use config::MoveConfig;
pub use move_to::{MOVE_SUBTASK_KIND, MoveRequest, MoveToTask};
