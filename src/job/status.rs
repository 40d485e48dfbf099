//! Job status state machine.

use serde::{Deserialize, Serialize};

/// Local status of an activated job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is being handled by the task function.
    Running,
    /// Task function finished; `after` decorators are running.
    RunningAfterDecorators,
    /// Job was reported as completed.
    Completed,
    /// Job was reported as failed.
    Failed,
    /// A BPMN error was thrown for the job.
    ErrorThrown,
}

impl JobStatus {
    /// Check if this status allows transitioning to another status.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        use JobStatus::*;

        matches!(
            (self, target),
            (Running, RunningAfterDecorators)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, ErrorThrown)
                | (RunningAfterDecorators, Completed)
                | (RunningAfterDecorators, Failed)
                | (RunningAfterDecorators, ErrorThrown)
        )
    }

    /// Check if the outcome of the job has been reported.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::ErrorThrown)
    }

    /// Check if the job may still report an outcome.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::RunningAfterDecorators => "running_after_decorators",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::ErrorThrown => "error_thrown",
        };
        write!(f, "{s}")
    }
}
