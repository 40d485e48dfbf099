//! In-memory gateway — tracks active jobs and records every accepted report.
//!
//! Used by the demo binary and the test suites in place of a real engine.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::JobGateway;
use crate::error::JobError;
use crate::job::{JobStatus, Variables};

/// A report accepted by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayReport {
    Completed {
        job_key: i64,
        variables: Variables,
    },
    Failed {
        job_key: i64,
        retries: i32,
        message: String,
        retry_back_off: Duration,
        variables: Variables,
    },
    ErrorThrown {
        job_key: i64,
        message: String,
        error_code: String,
        variables: Variables,
    },
}

impl GatewayReport {
    pub fn job_key(&self) -> i64 {
        match self {
            Self::Completed { job_key, .. }
            | Self::Failed { job_key, .. }
            | Self::ErrorThrown { job_key, .. } => *job_key,
        }
    }
}

/// Gateway that keeps job state in memory.
#[derive(Default)]
pub struct InMemoryGateway {
    jobs: RwLock<HashMap<i64, JobStatus>>,
    reports: RwLock<Vec<GatewayReport>>,
}

impl InMemoryGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a job as activated so it may report an outcome.
    pub async fn activate(&self, job_key: i64) {
        self.jobs.write().await.insert(job_key, JobStatus::Running);
    }

    /// Deactivate a job behind the worker's back (e.g. its lease timed out).
    pub async fn deactivate(&self, job_key: i64) {
        if let Some(status) = self.jobs.write().await.get_mut(&job_key) {
            *status = JobStatus::Failed;
        }
    }

    /// Status of a job as the gateway sees it.
    pub async fn status(&self, job_key: i64) -> Option<JobStatus> {
        self.jobs.read().await.get(&job_key).copied()
    }

    /// All accepted reports, in arrival order.
    pub async fn reports(&self) -> Vec<GatewayReport> {
        self.reports.read().await.clone()
    }

    /// Keys of jobs reported as completed.
    pub async fn completed(&self) -> Vec<i64> {
        self.reports
            .read()
            .await
            .iter()
            .filter(|r| matches!(r, GatewayReport::Completed { .. }))
            .map(GatewayReport::job_key)
            .collect()
    }

    /// Keys of jobs reported as failed.
    pub async fn failed(&self) -> Vec<i64> {
        self.reports
            .read()
            .await
            .iter()
            .filter(|r| matches!(r, GatewayReport::Failed { .. }))
            .map(GatewayReport::job_key)
            .collect()
    }

    async fn deactivate_with(
        &self,
        job_key: i64,
        status: JobStatus,
        report: GatewayReport,
    ) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().await;
        let current = jobs.get_mut(&job_key).ok_or(JobError::NotFound { job_key })?;

        if *current != JobStatus::Running {
            return Err(JobError::AlreadyDeactivated { job_key });
        }
        *current = status;
        drop(jobs);

        debug!(job_key, status = %status, "Gateway accepted report");
        self.reports.write().await.push(report);
        Ok(())
    }
}

#[async_trait]
impl JobGateway for InMemoryGateway {
    async fn complete_job(&self, job_key: i64, variables: Variables) -> Result<(), JobError> {
        self.deactivate_with(
            job_key,
            JobStatus::Completed,
            GatewayReport::Completed { job_key, variables },
        )
        .await
    }

    async fn fail_job(
        &self,
        job_key: i64,
        retries: i32,
        message: &str,
        retry_back_off: Duration,
        variables: Variables,
    ) -> Result<(), JobError> {
        self.deactivate_with(
            job_key,
            JobStatus::Failed,
            GatewayReport::Failed {
                job_key,
                retries,
                message: message.to_string(),
                retry_back_off,
                variables,
            },
        )
        .await
    }

    async fn throw_error(
        &self,
        job_key: i64,
        message: &str,
        error_code: &str,
        variables: Variables,
    ) -> Result<(), JobError> {
        self.deactivate_with(
            job_key,
            JobStatus::ErrorThrown,
            GatewayReport::ErrorThrown {
                job_key,
                message: message.to_string(),
                error_code: error_code.to_string(),
                variables,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_active_job() {
        let gateway = InMemoryGateway::new();
        gateway.activate(1).await;

        gateway.complete_job(1, Variables::new()).await.unwrap();
        assert_eq!(gateway.status(1).await, Some(JobStatus::Completed));
        assert_eq!(gateway.completed().await, vec![1]);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let gateway = InMemoryGateway::new();
        let err = gateway.complete_job(9, Variables::new()).await.unwrap_err();
        assert!(matches!(err, JobError::NotFound { job_key: 9 }));
    }

    #[tokio::test]
    async fn second_report_is_already_deactivated() {
        let gateway = InMemoryGateway::new();
        gateway.activate(1).await;
        gateway
            .fail_job(1, 2, "boom", Duration::ZERO, Variables::new())
            .await
            .unwrap();

        let err = gateway.complete_job(1, Variables::new()).await.unwrap_err();
        assert!(matches!(err, JobError::AlreadyDeactivated { job_key: 1 }));
        assert_eq!(gateway.reports().await.len(), 1);
    }

    #[tokio::test]
    async fn failure_reports_keep_variables() {
        let gateway = InMemoryGateway::new();
        gateway.activate(1).await;
        gateway.activate(2).await;

        let mut vars = Variables::new();
        vars.insert("attempt".into(), serde_json::json!(2));
        gateway
            .fail_job(1, 1, "boom", Duration::ZERO, vars.clone())
            .await
            .unwrap();
        gateway
            .throw_error(2, "bad input", "E1", vars.clone())
            .await
            .unwrap();

        let reports = gateway.reports().await;
        assert!(matches!(
            &reports[0],
            GatewayReport::Failed { variables, .. } if *variables == vars
        ));
        assert!(matches!(
            &reports[1],
            GatewayReport::ErrorThrown { variables, .. } if *variables == vars
        ));
    }

    #[tokio::test]
    async fn deactivated_job_rejects_error() {
        let gateway = InMemoryGateway::new();
        gateway.activate(3).await;
        gateway.deactivate(3).await;

        let err = gateway
            .throw_error(3, "bad input", "E1", Variables::new())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::AlreadyDeactivated { job_key: 3 }));
        assert!(gateway.reports().await.is_empty());
    }
}
