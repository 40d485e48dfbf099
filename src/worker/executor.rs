//! Job executor — pulls jobs for one task type and runs each one
//! concurrently, then drains on stop.
//!
//! Every job pulled from the queue is paired with a [`JobCompletionGuard`]
//! before it is spawned. The guard's `Drop` marks the queue slot done and
//! removes the job from [`TaskState`], so cleanup runs whether the handler
//! returns, fails, panics or its task is dropped. `stop()` relies on this to
//! terminate.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::JobError;
use crate::gateway::JobGateway;
use crate::job::{Job, JobController};
use crate::task::Task;
use crate::worker::queue::JobQueue;
use crate::worker::task_state::TaskState;

/// Drives execution of the jobs of one task type.
///
/// Clones share the queue, task state and stop signal.
#[derive(Clone)]
pub struct JobExecutor {
    task: Arc<Task>,
    jobs: Arc<JobQueue>,
    task_state: Arc<TaskState>,
    gateway: Arc<dyn JobGateway>,
    stop_token: CancellationToken,
    /// Caps concurrently running jobs. `None` = unbounded.
    concurrency: Option<Arc<Semaphore>>,
}

impl JobExecutor {
    /// Create an executor with unbounded concurrency.
    pub fn new(
        task: Task,
        jobs: Arc<JobQueue>,
        task_state: Arc<TaskState>,
        gateway: Arc<dyn JobGateway>,
    ) -> Self {
        Self {
            task: Arc::new(task),
            jobs,
            task_state,
            gateway,
            stop_token: CancellationToken::new(),
            concurrency: None,
        }
    }

    /// Allow at most `max` jobs to run at once. A permit is taken before a
    /// job is pulled, so queued jobs wait in the queue.
    pub fn with_concurrency_limit(mut self, max: usize) -> Self {
        self.concurrency = Some(Arc::new(Semaphore::new(max.max(1))));
        self
    }

    pub fn task_type(&self) -> &str {
        self.task.task_type()
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.jobs
    }

    pub fn task_state(&self) -> &Arc<TaskState> {
        &self.task_state
    }

    /// Pull jobs and spawn their execution until stopped.
    ///
    /// Never waits for a spawned job; the only suspension points are the
    /// queue wait and, with a concurrency limit, the permit wait.
    pub async fn execute(&self) {
        info!(task_type = %self.task_type(), "Job executor started");

        while self.should_execute() {
            let permit = match &self.concurrency {
                None => None,
                Some(semaphore) => tokio::select! {
                    biased;
                    _ = self.stop_token.cancelled() => break,
                    permit = Arc::clone(semaphore).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                },
            };

            let job = tokio::select! {
                biased;
                _ = self.stop_token.cancelled() => break,
                job = self.jobs.pop() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            self.dispatch(job, permit);
        }

        info!(task_type = %self.task_type(), "Job executor stopped pulling jobs");
    }

    /// Run one job through the task handler.
    ///
    /// [`JobError::AlreadyDeactivated`] is logged as a warning and otherwise
    /// treated as a normal finish. Other errors are the handler's to report;
    /// they are logged here and go no further.
    pub async fn execute_one_job(&self, job: Job) {
        let controller = JobController::new(&job, Arc::clone(&self.gateway));
        let job_key = job.key;

        match self.task.handler().handle(job, &controller).await {
            Ok(_) => debug!(job_key, "Job handled"),
            Err(JobError::AlreadyDeactivated { job_key }) => {
                warn!(job_key, "Job was already deactivated");
            }
            Err(e) => {
                error!(job_key, error = %e, "Job handler returned an error");
            }
        }
    }

    /// True until `stop()` is called.
    pub fn should_execute(&self) -> bool {
        !self.stop_token.is_cancelled()
    }

    /// Stop pulling jobs and wait until every job handed to this executor
    /// has finished.
    ///
    /// The queue is closed so later pushes are rejected. Jobs that were
    /// already queued are dispatched before waiting. There is no timeout;
    /// wrap the call in one if shutdown must be bounded.
    pub async fn stop(&self) {
        info!(task_type = %self.task_type(), "Stopping job executor");
        self.stop_token.cancel();
        self.jobs.close();

        while let Some(job) = self.jobs.try_pop() {
            let permit = self.acquire_permit().await;
            debug!(job_key = job.key, "Dispatching queued job during shutdown");
            self.dispatch(job, permit);
        }

        self.jobs.join().await;
        info!(task_type = %self.task_type(), "Job executor drained");
    }

    async fn acquire_permit(&self) -> Option<OwnedSemaphorePermit> {
        match &self.concurrency {
            None => None,
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
        }
    }

    fn dispatch(&self, job: Job, permit: Option<OwnedSemaphorePermit>) {
        debug!(job_key = job.key, task_type = %job.job_type, "Dispatching job");
        self.task_state.add(&job);

        let guard = JobCompletionGuard {
            jobs: Arc::clone(&self.jobs),
            task_state: Arc::clone(&self.task_state),
            job: job.clone(),
            _permit: permit,
        };
        let executor = self.clone();

        tokio::spawn(async move {
            let _guard = guard;
            let job_key = job.key;
            if AssertUnwindSafe(executor.execute_one_job(job))
                .catch_unwind()
                .await
                .is_err()
            {
                error!(job_key, "Job handler panicked");
            }
        });
    }
}

/// Runs the completion bookkeeping for one job when dropped.
struct JobCompletionGuard {
    jobs: Arc<JobQueue>,
    task_state: Arc<TaskState>,
    job: Job,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Drop for JobCompletionGuard {
    fn drop(&mut self) {
        if let Err(e) = self.jobs.task_done() {
            error!(job_key = self.job.key, error = %e, "Failed to mark job done");
        }
        self.task_state.remove(&self.job);
    }
}
