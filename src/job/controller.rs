//! Per-job outcome reporting.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::JobError;
use crate::gateway::JobGateway;
use crate::job::{Job, JobStatus, Variables};

/// Capability a handler uses to report the outcome of one job.
///
/// The first successful status transition claims the job's single report;
/// any later report fails with [`JobError::AlreadyDeactivated`] without
/// contacting the gateway.
pub struct JobController {
    job_key: i64,
    retries: i32,
    status: Mutex<JobStatus>,
    gateway: Arc<dyn JobGateway>,
}

impl JobController {
    /// Create a controller for a freshly activated job.
    pub fn new(job: &Job, gateway: Arc<dyn JobGateway>) -> Self {
        Self {
            job_key: job.key,
            retries: job.retries,
            status: Mutex::new(JobStatus::Running),
            gateway,
        }
    }

    pub fn job_key(&self) -> i64 {
        self.job_key
    }

    /// Current local status.
    pub fn status(&self) -> JobStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition_to(&self, target: JobStatus) -> Result<(), JobError> {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if !status.can_transition_to(target) {
            return Err(JobError::AlreadyDeactivated {
                job_key: self.job_key,
            });
        }
        *status = target;
        Ok(())
    }

    /// Mark that the task function returned and `after` decorators run next.
    pub async fn set_running_after_decorators_status(&self) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *status == JobStatus::Running {
            *status = JobStatus::RunningAfterDecorators;
        }
    }

    /// Report the job as completed.
    pub async fn set_success_status(&self, variables: Variables) -> Result<(), JobError> {
        self.transition_to(JobStatus::Completed)?;
        self.gateway.complete_job(self.job_key, variables).await
    }

    /// Report the job as failed, consuming one retry.
    pub async fn set_failure_status(
        &self,
        message: &str,
        retry_back_off: Duration,
        variables: Variables,
    ) -> Result<(), JobError> {
        self.transition_to(JobStatus::Failed)?;
        self.gateway
            .fail_job(
                self.job_key,
                self.retries - 1,
                message,
                retry_back_off,
                variables,
            )
            .await
    }

    /// Throw a BPMN error for the job.
    pub async fn set_error_status(
        &self,
        message: &str,
        error_code: &str,
        variables: Variables,
    ) -> Result<(), JobError> {
        self.transition_to(JobStatus::ErrorThrown)?;
        self.gateway
            .throw_error(self.job_key, message, error_code, variables)
            .await
    }
}

impl std::fmt::Debug for JobController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobController")
            .field("job_key", &self.job_key)
            .field("retries", &self.retries)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayReport, InMemoryGateway};

    async fn setup(retries: i32) -> (Arc<InMemoryGateway>, JobController) {
        let gateway = Arc::new(InMemoryGateway::new());
        let job = Job::new(10, "test", Variables::new()).with_retries(retries);
        gateway.activate(job.key).await;
        let controller = JobController::new(&job, gateway.clone());
        (gateway, controller)
    }

    #[tokio::test]
    async fn success_reports_completion() {
        let (gateway, controller) = setup(3).await;
        controller.set_success_status(Variables::new()).await.unwrap();

        assert_eq!(controller.status(), JobStatus::Completed);
        assert_eq!(gateway.completed().await, vec![10]);
    }

    #[tokio::test]
    async fn failure_consumes_a_retry() {
        let (gateway, controller) = setup(3).await;
        controller
            .set_failure_status("boom", Duration::from_millis(100), Variables::new())
            .await
            .unwrap();

        match &gateway.reports().await[0] {
            GatewayReport::Failed {
                retries, message, ..
            } => {
                assert_eq!(*retries, 2);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_report_is_rejected_locally() {
        let (gateway, controller) = setup(3).await;
        controller.set_success_status(Variables::new()).await.unwrap();

        let err = controller
            .set_error_status("late", "E1", Variables::new())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::AlreadyDeactivated { job_key: 10 }));
        assert_eq!(gateway.reports().await.len(), 1);
    }

    #[tokio::test]
    async fn report_after_remote_deactivation_is_detected() {
        let (gateway, controller) = setup(3).await;
        gateway.deactivate(10).await;

        let err = controller
            .set_success_status(Variables::new())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::AlreadyDeactivated { job_key: 10 }));
    }

    #[tokio::test]
    async fn after_decorators_status_allows_completion() {
        let (_gateway, controller) = setup(3).await;
        controller.set_running_after_decorators_status().await;
        assert_eq!(controller.status(), JobStatus::RunningAfterDecorators);

        controller.set_success_status(Variables::new()).await.unwrap();
        assert_eq!(controller.status(), JobStatus::Completed);
    }
}
