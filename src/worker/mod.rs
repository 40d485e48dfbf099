//! Worker system — job execution per task type.
//!
//! Core components:
//! - `queue` — JobQueue fed by the poller, with join semantics for draining
//! - `task_state` — TaskState registry of jobs under execution
//! - `executor` — JobExecutor (pull, spawn, drain on stop)
//! - `worker` — Worker owning one executor per registered task type

pub mod executor;
pub mod queue;
pub mod task_state;
pub mod worker;

pub use executor::JobExecutor;
pub use queue::JobQueue;
pub use task_state::TaskState;
pub use worker::Worker;
