//! Worker — one executor per registered task type.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::WorkerConfig;
use crate::error::{Error, WorkerError};
use crate::gateway::JobGateway;
use crate::job::Job;
use crate::task::Task;
use crate::worker::executor::JobExecutor;
use crate::worker::queue::JobQueue;
use crate::worker::task_state::TaskState;

/// Owns the executors of all registered tasks and their lifecycle.
pub struct Worker {
    config: WorkerConfig,
    gateway: Arc<dyn JobGateway>,
    executors: HashMap<String, JobExecutor>,
    handles: Vec<JoinHandle<()>>,
    started: bool,
}

impl Worker {
    /// Create a worker with no tasks.
    pub fn new(config: WorkerConfig, gateway: Arc<dyn JobGateway>) -> Self {
        Self {
            config,
            gateway,
            executors: HashMap::new(),
            handles: Vec::new(),
            started: false,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Register a task, creating its queue, task state and executor.
    pub fn register(&mut self, task: Task) -> Result<(), WorkerError> {
        if self.started {
            return Err(WorkerError::AlreadyStarted);
        }
        let task_type = task.task_type().to_string();
        if self.executors.contains_key(&task_type) {
            return Err(WorkerError::DuplicateTask { task_type });
        }

        let mut executor = JobExecutor::new(
            task,
            JobQueue::new(),
            Arc::new(TaskState::new()),
            Arc::clone(&self.gateway),
        );
        if let Some(max) = self.config.max_concurrent_jobs_per_task {
            executor = executor.with_concurrency_limit(max);
        }

        info!(worker = %self.config.name, task_type = %task_type, "Registered task");
        self.executors.insert(task_type, executor);
        Ok(())
    }

    /// Registered task types.
    pub fn task_types(&self) -> Vec<&str> {
        self.executors.keys().map(String::as_str).collect()
    }

    fn executor(&self, task_type: &str) -> Result<&JobExecutor, WorkerError> {
        self.executors
            .get(task_type)
            .ok_or_else(|| WorkerError::UnknownTask {
                task_type: task_type.to_string(),
            })
    }

    /// Queue feeding the executor of a task type.
    pub fn queue(&self, task_type: &str) -> Result<Arc<JobQueue>, WorkerError> {
        Ok(Arc::clone(self.executor(task_type)?.queue()))
    }

    /// Jobs executing for a task type.
    pub fn task_state(&self, task_type: &str) -> Result<Arc<TaskState>, WorkerError> {
        Ok(Arc::clone(self.executor(task_type)?.task_state()))
    }

    /// Route an activated job to the queue of its task type.
    pub fn enqueue(&self, job: Job) -> Result<(), Error> {
        self.executor(&job.job_type)?.queue().push(job)?;
        Ok(())
    }

    /// Spawn the run loop of every executor.
    pub fn start(&mut self) -> Result<(), WorkerError> {
        if self.started {
            return Err(WorkerError::AlreadyStarted);
        }
        self.started = true;

        for executor in self.executors.values() {
            let executor = executor.clone();
            self.handles
                .push(tokio::spawn(async move { executor.execute().await }));
        }

        info!(
            worker = %self.config.name,
            tasks = self.executors.len(),
            "Worker started"
        );
        Ok(())
    }

    /// Stop all executors concurrently and wait for every job to drain.
    pub async fn stop(&mut self) {
        info!(worker = %self.config.name, "Worker stopping");

        join_all(self.executors.values().map(|executor| executor.stop())).await;

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "Executor loop terminated abnormally");
            }
        }

        info!(worker = %self.config.name, "Worker stopped");
    }
}
