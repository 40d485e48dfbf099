//! `JobGateway` trait — the outcome-reporting surface of the engine gateway.
//!
//! The transport behind it (gRPC channel, credentials, retries) lives outside
//! this crate. Implementations map "job no longer active" answers from the
//! engine to [`JobError::AlreadyDeactivated`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::JobError;
use crate::job::Variables;

/// Backend-agnostic gateway used to report job outcomes.
#[async_trait]
pub trait JobGateway: Send + Sync {
    /// Report a job as completed with its output variables.
    async fn complete_job(&self, job_key: i64, variables: Variables) -> Result<(), JobError>;

    /// Report a job as failed. `retries` is the number of retries left.
    async fn fail_job(
        &self,
        job_key: i64,
        retries: i32,
        message: &str,
        retry_back_off: Duration,
        variables: Variables,
    ) -> Result<(), JobError>;

    /// Throw a BPMN error for a job.
    async fn throw_error(
        &self,
        job_key: i64,
        message: &str,
        error_code: &str,
        variables: Variables,
    ) -> Result<(), JobError>;
}
