use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::{Value, json};

use zeebe_worker::{
    BoxError, InMemoryGateway, Job, Task, TaskConfig, Variables, Worker, WorkerConfig,
    task_fn,
};

/// Number of demo jobs to feed; 10 when unset.
fn demo_job_count(raw: Option<String>) -> anyhow::Result<i64> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("ZEEBE_WORKER_DEMO_JOBS must be a number, got {raw:?}")),
        None => Ok(10),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WorkerConfig::from_env()?;

    let job_count = demo_job_count(std::env::var("ZEEBE_WORKER_DEMO_JOBS").ok())?;

    eprintln!("Zeebe worker demo v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Worker: {}", config.name);
    eprintln!("   Jobs: {}", job_count);

    let gateway = Arc::new(InMemoryGateway::new());
    let mut worker = Worker::new(config, gateway.clone());

    // ── Tasks ────────────────────────────────────────────────────────────
    worker.register(Task::new(
        TaskConfig::new("echo"),
        Arc::new(task_fn(|vars: Variables| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(json!({ "echoed": Value::Object(vars) }))
        })),
    )?)?;

    worker.register(Task::new(
        TaskConfig::new("flaky").with_variables_to_fetch(["n"]),
        Arc::new(task_fn(|vars: Variables| async move {
            match vars.get("n").and_then(Value::as_i64) {
                Some(n) if n % 3 == 0 => Err(BoxError::from(format!("{n} is divisible by three"))),
                _ => Ok(Value::Null),
            }
        })),
    )?)?;

    worker.start()?;

    // ── Feed jobs (stands in for the poller) ────────────────────────────
    for key in 0..job_count {
        let task_type = if key % 2 == 0 { "echo" } else { "flaky" };
        let variables = json!({ "n": key }).as_object().cloned().unwrap_or_default();
        gateway.activate(key).await;
        worker.enqueue(Job::new(key, task_type, variables))?;
    }

    worker.stop().await;

    eprintln!("   Completed: {}", gateway.completed().await.len());
    eprintln!("   Failed: {}", gateway.failed().await.len());
    Ok(())
}
