//! Reporting of task function failures.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{BoxError, JobError};
use crate::job::{Job, JobController, Variables};

/// Decides how a failed task function is reported to the engine.
#[async_trait]
pub trait ExceptionHandler: Send + Sync {
    async fn handle(
        &self,
        error: &BoxError,
        job: &Job,
        controller: &JobController,
    ) -> Result<(), JobError>;
}

/// Logs the failure and reports the job as failed with the error message.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExceptionHandler;

#[async_trait]
impl ExceptionHandler for DefaultExceptionHandler {
    async fn handle(
        &self,
        error: &BoxError,
        job: &Job,
        controller: &JobController,
    ) -> Result<(), JobError> {
        warn!(
            task_type = %job.job_type,
            job_key = job.key,
            error = %error,
            "Failed job"
        );
        controller
            .set_failure_status(
                &format!("Failed job. Error: {error}"),
                Duration::ZERO,
                Variables::new(),
            )
            .await
    }
}
