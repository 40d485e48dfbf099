//! Registry of jobs currently executing for a task type.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::job::Job;

/// Keys of the jobs under execution, counted per key.
///
/// The engine may hand out a key again while an earlier run of it is still
/// executing, so each `add` is matched by exactly one `remove`.
/// Methods are synchronous so cleanup can run from `Drop`.
#[derive(Debug, Default)]
pub struct TaskState {
    active: Mutex<HashMap<i64, usize>>,
}

impl TaskState {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, usize>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that a job started executing.
    pub fn add(&self, job: &Job) {
        *self.lock().entry(job.key).or_insert(0) += 1;
    }

    /// Forget one execution of a job. Removing an unknown job is a no-op;
    /// returns whether the job was present.
    pub fn remove(&self, job: &Job) -> bool {
        let mut active = self.lock();
        let remaining = active.get_mut(&job.key).map(|count| {
            *count -= 1;
            *count
        });
        if remaining == Some(0) {
            active.remove(&job.key);
        }
        let removed = remaining.is_some();
        drop(active);
        if !removed {
            warn!(job_key = job.key, "Could not find job in task state when removing it");
        }
        removed
    }

    /// Check if a job is executing.
    pub fn contains(&self, job_key: i64) -> bool {
        self.lock().contains_key(&job_key)
    }

    /// Number of executions in flight, counting repeated keys.
    pub fn count_active(&self) -> usize {
        self.lock().values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Keys of all executing jobs, once per execution, in no particular order.
    pub fn snapshot(&self) -> Vec<i64> {
        self.lock()
            .iter()
            .flat_map(|(key, count)| std::iter::repeat_n(*key, *count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Variables;

    fn job(key: i64) -> Job {
        Job::new(key, "test", Variables::new())
    }

    #[test]
    fn add_and_remove() {
        let state = TaskState::new();
        state.add(&job(1));
        state.add(&job(2));
        assert_eq!(state.count_active(), 2);
        assert!(state.contains(1));

        assert!(state.remove(&job(1)));
        assert!(!state.contains(1));
        assert_eq!(state.snapshot(), vec![2]);
    }

    #[test]
    fn removing_absent_job_is_noop() {
        let state = TaskState::new();
        state.add(&job(1));

        assert!(!state.remove(&job(99)));
        assert!(state.remove(&job(1)));
        assert!(!state.remove(&job(1)));
        assert!(state.is_empty());
    }

    #[test]
    fn repeated_key_stays_until_last_removal() {
        let state = TaskState::new();
        state.add(&job(7));
        state.add(&job(7));
        assert_eq!(state.count_active(), 2);
        assert_eq!(state.snapshot(), vec![7, 7]);

        assert!(state.remove(&job(7)));
        assert!(state.contains(7));
        assert_eq!(state.count_active(), 1);

        assert!(state.remove(&job(7)));
        assert!(!state.contains(7));
        assert!(!state.remove(&job(7)));
    }

    #[test]
    fn concurrent_add_remove() {
        let state = std::sync::Arc::new(TaskState::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let j = job(t * 1000 + i);
                        state.add(&j);
                        state.remove(&j);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(state.is_empty());
    }
}
