//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Worker-wide configuration.
///
/// `request_timeout` and `poll_retry_delay` are read by the job poller that
/// feeds the queues; the executors themselves only use the concurrency cap.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Worker name reported to the engine on activation.
    pub name: String,
    /// Long-poll timeout of one activation request, used by the poller.
    pub request_timeout: Duration,
    /// Delay before the poller tries again after a failed poll.
    pub poll_retry_delay: Duration,
    /// Cap on concurrently executing jobs per task type (`None` = unbounded).
    pub max_concurrent_jobs_per_task: Option<usize>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: format!("worker-{}", uuid::Uuid::new_v4()),
            request_timeout: Duration::from_secs(10),
            poll_retry_delay: Duration::from_secs(5),
            max_concurrent_jobs_per_task: None,
        }
    }
}

impl WorkerConfig {
    /// Build a config from `ZEEBE_WORKER_*` environment variables, falling
    /// back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(name) = lookup("ZEEBE_WORKER_NAME") {
            config.name = name;
        }
        if let Some(raw) = lookup("ZEEBE_WORKER_REQUEST_TIMEOUT_MS") {
            let ms = parse_number::<u64>("ZEEBE_WORKER_REQUEST_TIMEOUT_MS", &raw)?;
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("ZEEBE_WORKER_POLL_RETRY_DELAY_MS") {
            let ms = parse_number::<u64>("ZEEBE_WORKER_POLL_RETRY_DELAY_MS", &raw)?;
            config.poll_retry_delay = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("ZEEBE_WORKER_MAX_CONCURRENT_JOBS") {
            let max = parse_number::<usize>("ZEEBE_WORKER_MAX_CONCURRENT_JOBS", &raw)?;
            if max == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "ZEEBE_WORKER_MAX_CONCURRENT_JOBS".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
            config.max_concurrent_jobs_per_task = Some(max);
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_unbounded() {
        let config = WorkerConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.name.starts_with("worker-"));
        assert_eq!(config.max_concurrent_jobs_per_task, None);
    }

    #[test]
    fn reads_overrides() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("ZEEBE_WORKER_NAME", "payments"),
            ("ZEEBE_WORKER_REQUEST_TIMEOUT_MS", "30000"),
            ("ZEEBE_WORKER_POLL_RETRY_DELAY_MS", "250"),
            ("ZEEBE_WORKER_MAX_CONCURRENT_JOBS", "8"),
        ]))
        .unwrap();
        assert_eq!(config.name, "payments");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_retry_delay, Duration::from_millis(250));
        assert_eq!(config.max_concurrent_jobs_per_task, Some(8));
    }

    #[test]
    fn rejects_invalid_numbers() {
        let err = WorkerConfig::from_lookup(lookup(&[("ZEEBE_WORKER_MAX_CONCURRENT_JOBS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = WorkerConfig::from_lookup(lookup(&[("ZEEBE_WORKER_MAX_CONCURRENT_JOBS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
