//! User-supplied task logic.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BoxError;
use crate::job::{Job, Variables};

/// The business logic of a task: fetched variables in, output out.
///
/// The output is a JSON object of variables to set on completion, or any
/// value when the task is configured with `single_value`. `null` counts as
/// "no output".
#[async_trait]
pub trait TaskFunction: Send + Sync {
    async fn run(&self, variables: Variables) -> Result<Value, BoxError>;
}

/// [`TaskFunction`] backed by an async closure. See [`task_fn`].
pub struct FnTask<F> {
    f: F,
}

/// Wrap an async closure as a [`TaskFunction`].
pub fn task_fn<F, Fut>(f: F) -> FnTask<F>
where
    F: Fn(Variables) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    FnTask { f }
}

#[async_trait]
impl<F, Fut> TaskFunction for FnTask<F>
where
    F: Fn(Variables) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    async fn run(&self, variables: Variables) -> Result<Value, BoxError> {
        (self.f)(variables).await
    }
}

/// Hook run on the job before or after the task function.
///
/// A failing decorator is logged and the job continues unchanged.
#[async_trait]
pub trait TaskDecorator: Send + Sync {
    async fn decorate(&self, job: Job) -> Result<Job, BoxError>;
}

/// [`TaskDecorator`] backed by an async closure. See [`decorator_fn`].
pub struct FnDecorator<F> {
    f: F,
}

/// Wrap an async closure as a [`TaskDecorator`].
pub fn decorator_fn<F, Fut>(f: F) -> FnDecorator<F>
where
    F: Fn(Job) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Job, BoxError>> + Send + 'static,
{
    FnDecorator { f }
}

#[async_trait]
impl<F, Fut> TaskDecorator for FnDecorator<F>
where
    F: Fn(Job) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Job, BoxError>> + Send + 'static,
{
    async fn decorate(&self, job: Job) -> Result<Job, BoxError> {
        (self.f)(job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn closure_task_runs() {
        let f = task_fn(|vars: Variables| async move { Ok(json!({ "echo": vars["x"] })) });
        let mut vars = Variables::new();
        vars.insert("x".into(), json!(5));
        assert_eq!(f.run(vars).await.unwrap(), json!({ "echo": 5 }));
    }

    #[tokio::test]
    async fn closure_decorator_runs() {
        let d = decorator_fn(|mut job: Job| async move {
            job.variables.insert("seen".into(), json!(true));
            Ok(job)
        });
        let job = d.decorate(Job::new(1, "test", Variables::new())).await.unwrap();
        assert_eq!(job.variables["seen"], json!(true));
    }
}
