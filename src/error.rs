//! Error types for the job worker.

/// Opaque error raised by user task functions and decorators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for the worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Errors reported while talking to the gateway about a single job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The gateway no longer considers the job active (completed, failed or
    /// timed out elsewhere), or its outcome was already reported locally.
    #[error("Job {job_key} was already deactivated")]
    AlreadyDeactivated { job_key: i64 },

    #[error("Job {job_key} not found")]
    NotFound { job_key: i64 },

    #[error("Gateway request for job {job_key} failed: {reason}")]
    Gateway { job_key: i64, reason: String },
}

impl JobError {
    /// Key of the job the error refers to.
    pub fn job_key(&self) -> i64 {
        match self {
            Self::AlreadyDeactivated { job_key }
            | Self::NotFound { job_key }
            | Self::Gateway { job_key, .. } => *job_key,
        }
    }
}

/// Job queue errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed,

    #[error("task_done() called more times than there were items in the queue")]
    TaskDoneUnderflow,
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Task {task_type} returns a single value but no variable name was given")]
    NoVariableNameGiven { task_type: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Worker registration and lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Task {task_type} is already registered")]
    DuplicateTask { task_type: String },

    #[error("Task {task_type} is not registered")]
    UnknownTask { task_type: String },

    #[error("Worker is already started")]
    AlreadyStarted,
}

/// Result type alias for the worker.
pub type Result<T> = std::result::Result<T, Error>;
