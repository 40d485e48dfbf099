//! Builds a [`JobHandler`] around a user [`TaskFunction`].
//!
//! The built handler runs one job end to end:
//! 1. `before` decorators
//! 2. the task function on the fetched variables
//! 3. the exception handler, if the function failed
//! 4. `after` decorators
//! 5. the completion report, if the function succeeded

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::config::TaskConfig;
use super::exception_handler::{DefaultExceptionHandler, ExceptionHandler};
use super::function::{TaskDecorator, TaskFunction};
use super::JobHandler;
use crate::error::{BoxError, JobError};
use crate::job::{Job, JobController, Variables};

/// Job handler produced from a task function and its config.
pub struct TaskJobHandler {
    config: TaskConfig,
    function: Arc<dyn TaskFunction>,
    exception_handler: Arc<dyn ExceptionHandler>,
}

impl TaskJobHandler {
    pub fn new(config: TaskConfig, function: Arc<dyn TaskFunction>) -> Self {
        let exception_handler = config
            .exception_handler
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultExceptionHandler));
        Self {
            config,
            function,
            exception_handler,
        }
    }

    /// Run the task function. Returns its output and whether it succeeded.
    async fn run_function(
        &self,
        job: &Job,
        controller: &JobController,
    ) -> Result<(Variables, bool), JobError> {
        let variables = job.variables_to_fetch(self.config.variables_to_fetch.as_deref());

        let result = self
            .function
            .run(variables)
            .await
            .and_then(|value| self.to_output(value));

        match result {
            Ok(output) => Ok((output, true)),
            Err(e) => {
                debug!(job_key = job.key, error = %e, "Task function failed");
                self.exception_handler.handle(&e, job, controller).await?;
                Ok((Variables::new(), false))
            }
        }
    }

    fn to_output(&self, value: Value) -> Result<Variables, BoxError> {
        if self.config.single_value {
            let name = self.config.variable_name.clone().unwrap_or_default();
            let mut output = Variables::new();
            output.insert(name, value);
            return Ok(output);
        }

        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Variables::new()),
            other => Err(format!(
                "task {} returned {other}, expected an object of variables",
                self.config.task_type
            )
            .into()),
        }
    }
}

#[async_trait]
impl JobHandler for TaskJobHandler {
    async fn handle(&self, job: Job, controller: &JobController) -> Result<Job, JobError> {
        let mut job = run_decorators(&self.config.before, job).await;

        let (output, succeeded) = self.run_function(&job, controller).await?;
        job.variables
            .extend(output.iter().map(|(k, v)| (k.clone(), v.clone())));

        controller.set_running_after_decorators_status().await;
        let job = run_decorators(&self.config.after, job).await;

        if succeeded {
            controller.set_success_status(output).await?;
        }
        Ok(job)
    }
}

async fn run_decorators(decorators: &[Arc<dyn TaskDecorator>], mut job: Job) -> Job {
    for decorator in decorators {
        match decorator.decorate(job.clone()).await {
            Ok(decorated) => job = decorated,
            Err(e) => {
                warn!(job_key = job.key, error = %e, "Failed to run decorator");
            }
        }
    }
    job
}
