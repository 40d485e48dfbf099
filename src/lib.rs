//! Zeebe worker — in-process job execution core.

pub mod config;
pub mod error;
pub mod gateway;
pub mod job;
pub mod task;
pub mod worker;

pub use config::WorkerConfig;
pub use error::{BoxError, Error, JobError, Result};
pub use gateway::{InMemoryGateway, JobGateway};
pub use job::{Job, JobController, JobStatus, Variables};
pub use task::{Task, TaskConfig, task_fn};
pub use worker::{JobExecutor, JobQueue, TaskState, Worker};
