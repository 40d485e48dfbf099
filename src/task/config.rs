//! Per-task-type configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::task::exception_handler::ExceptionHandler;
use crate::task::function::TaskDecorator;
use crate::worker::TaskState;

/// Default activation lease.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of jobs requested per activation.
const DEFAULT_MAX_JOBS_TO_ACTIVATE: usize = 32;
/// Default limit on jobs held by the worker at once.
const DEFAULT_MAX_RUNNING_JOBS: usize = 32;

/// Configuration of one registered task type.
#[derive(Clone)]
pub struct TaskConfig {
    /// Task type name, as used in the process model.
    pub task_type: String,
    /// Activation lease the poller requests from the engine. The executor
    /// does not enforce it; the engine redelivers the job once it expires.
    pub timeout: Duration,
    pub max_jobs_to_activate: usize,
    pub max_running_jobs: usize,
    /// Variables handed to the task function (`None` = all).
    pub variables_to_fetch: Option<Vec<String>>,
    /// The task function returns one value stored under `variable_name`.
    pub single_value: bool,
    pub variable_name: Option<String>,
    /// Falls back to [`DefaultExceptionHandler`](super::DefaultExceptionHandler).
    pub exception_handler: Option<Arc<dyn ExceptionHandler>>,
    pub before: Vec<Arc<dyn TaskDecorator>>,
    pub after: Vec<Arc<dyn TaskDecorator>>,
}

impl TaskConfig {
    /// Create a config with defaults for the given task type.
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            timeout: DEFAULT_TIMEOUT,
            max_jobs_to_activate: DEFAULT_MAX_JOBS_TO_ACTIVATE,
            max_running_jobs: DEFAULT_MAX_RUNNING_JOBS,
            variables_to_fetch: None,
            single_value: false,
            variable_name: None,
            exception_handler: None,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_jobs_to_activate(mut self, max: usize) -> Self {
        self.max_jobs_to_activate = max;
        self
    }

    pub fn with_max_running_jobs(mut self, max: usize) -> Self {
        self.max_running_jobs = max;
        self
    }

    pub fn with_variables_to_fetch<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables_to_fetch = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Store the task function's return value under `variable_name`.
    pub fn with_single_value(mut self, variable_name: impl Into<String>) -> Self {
        self.single_value = true;
        self.variable_name = Some(variable_name.into());
        self
    }

    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    pub fn with_before(mut self, decorator: Arc<dyn TaskDecorator>) -> Self {
        self.before.push(decorator);
        self
    }

    pub fn with_after(mut self, decorator: Arc<dyn TaskDecorator>) -> Self {
        self.after.push(decorator);
        self
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_name = self
            .variable_name
            .as_deref()
            .is_some_and(|name| !name.is_empty());
        if self.single_value && !has_name {
            return Err(ConfigError::NoVariableNameGiven {
                task_type: self.task_type.clone(),
            });
        }
        Ok(())
    }

    /// How many jobs a poller may activate now without exceeding
    /// `max_running_jobs`.
    pub fn jobs_to_activate(&self, state: &TaskState) -> usize {
        let free = self.max_running_jobs.saturating_sub(state.count_active());
        self.max_jobs_to_activate.min(free)
    }
}

impl std::fmt::Debug for TaskConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskConfig")
            .field("task_type", &self.task_type)
            .field("timeout", &self.timeout)
            .field("max_jobs_to_activate", &self.max_jobs_to_activate)
            .field("max_running_jobs", &self.max_running_jobs)
            .field("variables_to_fetch", &self.variables_to_fetch)
            .field("single_value", &self.single_value)
            .field("variable_name", &self.variable_name)
            .field("exception_handler", &self.exception_handler.is_some())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}
