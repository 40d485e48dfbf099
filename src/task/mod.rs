//! Tasks — a task type name plus the handler that processes its jobs.

pub mod builder;
pub mod config;
pub mod exception_handler;
pub mod function;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ConfigError, JobError};
use crate::job::{Job, JobController};

pub use builder::TaskJobHandler;
pub use config::TaskConfig;
pub use exception_handler::{DefaultExceptionHandler, ExceptionHandler};
pub use function::{decorator_fn, task_fn, TaskDecorator, TaskFunction};

/// Processes one job and reports its outcome through the controller.
///
/// Errors other than [`JobError::AlreadyDeactivated`] are expected to have
/// been reported by the handler itself before it returns.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: Job, controller: &JobController) -> Result<Job, JobError>;
}

/// A registered task.
#[derive(Clone)]
pub struct Task {
    config: TaskConfig,
    handler: Arc<dyn JobHandler>,
}

impl Task {
    /// Build a task around a task function.
    pub fn new(config: TaskConfig, function: Arc<dyn TaskFunction>) -> Result<Self, ConfigError> {
        config.validate()?;
        let handler = Arc::new(TaskJobHandler::new(config.clone(), function));
        Ok(Self { config, handler })
    }

    /// Build a task around a raw job handler.
    pub fn with_handler(config: TaskConfig, handler: Arc<dyn JobHandler>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, handler })
    }

    pub fn task_type(&self) -> &str {
        &self.config.task_type
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn handler(&self) -> &Arc<dyn JobHandler> {
        &self.handler
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("config", &self.config).finish()
    }
}
