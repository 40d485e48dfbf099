//! Job queue — FIFO hand-off from the poller to an executor, with
//! join semantics for draining.
//!
//! Every pushed job counts as unfinished until [`JobQueue::task_done`] is
//! called for it. [`JobQueue::join`] waits for that count to reach zero.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::debug;

use crate::error::QueueError;
use crate::job::Job;

struct Inner {
    jobs: VecDeque<Job>,
    closed: bool,
}

/// Unbounded job queue shared between a producer and one executor.
pub struct JobQueue {
    inner: Mutex<Inner>,
    unfinished: AtomicUsize,
    job_ready: Notify,
    drained: Notify,
}

impl JobQueue {
    /// Create a new, open queue.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                jobs: VecDeque::new(),
                closed: false,
            }),
            unfinished: AtomicUsize::new(0),
            job_ready: Notify::new(),
            drained: Notify::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a job without waiting. Fails once the queue is closed.
    pub fn push(&self, job: Job) -> Result<(), QueueError> {
        {
            let mut inner = self.lock();
            if inner.closed {
                return Err(QueueError::Closed);
            }
            debug!(job_key = job.key, task_type = %job.job_type, "Job enqueued");
            self.unfinished.fetch_add(1, Ordering::AcqRel);
            inner.jobs.push_back(job);
        }
        self.job_ready.notify_one();
        Ok(())
    }

    /// Take the next job if one is waiting.
    pub fn try_pop(&self) -> Option<Job> {
        self.lock().jobs.pop_front()
    }

    /// Wait for the next job. Returns `None` once the queue is closed and
    /// empty.
    ///
    /// Cancel safe: dropping the future never loses a job.
    pub async fn pop(&self) -> Option<Job> {
        loop {
            let notified = self.job_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if let Some(job) = inner.jobs.pop_front() {
                    return Some(job);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Acknowledge that a job taken from the queue has been fully handled.
    pub fn task_done(&self) -> Result<(), QueueError> {
        let previous = self
            .unfinished
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_| QueueError::TaskDoneUnderflow)?;

        if previous == 1 {
            self.drained.notify_waiters();
        }
        Ok(())
    }

    /// Wait until every pushed job has been acknowledged with `task_done`.
    pub async fn join(&self) {
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();

            if self.unfinished.load(Ordering::Acquire) == 0 {
                return;
            }

            drained.await;
        }
    }

    /// Reject further pushes. Jobs already queued stay poppable.
    pub fn close(&self) {
        self.lock().closed = true;
        self.job_ready.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of jobs waiting to be popped.
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }

    /// Number of pushed jobs not yet acknowledged.
    pub fn unfinished(&self) -> usize {
        self.unfinished.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::job::Variables;

    fn job(key: i64) -> Job {
        Job::new(key, "test", Variables::new())
    }

    #[tokio::test]
    async fn push_pop_is_fifo() {
        let queue = JobQueue::new();
        queue.push(job(1)).unwrap();
        queue.push(job(2)).unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().await.unwrap().key, 1);
        assert_eq!(queue.pop().await.unwrap().key, 2);
        assert!(queue.is_empty());
        assert_eq!(queue.unfinished(), 2);
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let queue = JobQueue::new();
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(job(7)).unwrap();

        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("pop did not wake")
            .unwrap();
        assert_eq!(popped.unwrap().key, 7);
    }

    #[tokio::test]
    async fn close_rejects_push_and_ends_pop() {
        let queue = JobQueue::new();
        queue.push(job(1)).unwrap();
        queue.close();

        assert_eq!(queue.push(job(2)), Err(QueueError::Closed));
        assert_eq!(queue.pop().await.unwrap().key, 1);
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn close_wakes_waiting_pop() {
        let queue = JobQueue::new();
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("pop did not wake on close")
            .unwrap();
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn join_on_empty_queue_returns_immediately() {
        let queue = JobQueue::new();
        tokio::time::timeout(Duration::from_millis(100), queue.join())
            .await
            .expect("join hung on empty queue");
    }

    #[tokio::test]
    async fn join_waits_for_task_done() {
        let queue = JobQueue::new();
        queue.push(job(1)).unwrap();
        queue.push(job(2)).unwrap();
        queue.pop().await.unwrap();
        queue.pop().await.unwrap();

        let joiner = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.join().await })
        };

        queue.task_done().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!joiner.is_finished());

        queue.task_done().unwrap();
        tokio::time::timeout(Duration::from_secs(1), joiner)
            .await
            .expect("join did not return after drain")
            .unwrap();
    }

    #[test]
    fn task_done_underflow_is_an_error() {
        let queue = JobQueue::new();
        assert_eq!(queue.task_done(), Err(QueueError::TaskDoneUnderflow));
    }
}
