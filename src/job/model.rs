//! Activated job data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Job variables and custom headers: a JSON object.
pub type Variables = Map<String, Value>;

/// One unit of work activated from the workflow engine.
///
/// A `Job` is a passive value. Reporting its outcome goes through the
/// [`JobController`](super::JobController) the executor creates for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique key assigned by the engine.
    pub key: i64,
    /// Task type the job belongs to.
    #[serde(rename = "type")]
    pub job_type: String,
    pub process_instance_key: i64,
    pub bpmn_process_id: String,
    pub process_definition_version: i32,
    pub process_definition_key: i64,
    pub element_id: String,
    pub element_instance_key: i64,
    pub custom_headers: Variables,
    /// Name of the worker that activated the job.
    pub worker: String,
    /// Retries left before an incident is raised.
    pub retries: i32,
    /// When the activation lease expires.
    pub deadline: DateTime<Utc>,
    /// Input payload.
    pub variables: Variables,
}

impl Job {
    /// Create a job with the given key, type and variables. Remaining
    /// fields get neutral defaults.
    pub fn new(key: i64, job_type: impl Into<String>, variables: Variables) -> Self {
        Self {
            key,
            job_type: job_type.into(),
            process_instance_key: 0,
            bpmn_process_id: String::new(),
            process_definition_version: 0,
            process_definition_key: 0,
            element_id: String::new(),
            element_instance_key: 0,
            custom_headers: Variables::new(),
            worker: String::new(),
            retries: 3,
            deadline: Utc::now(),
            variables,
        }
    }

    /// Set the retries left.
    pub fn with_retries(mut self, retries: i32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the activating worker name.
    pub fn with_worker(mut self, worker: impl Into<String>) -> Self {
        self.worker = worker.into();
        self
    }

    /// Variables restricted to the given names. `None` keeps all of them.
    pub fn variables_to_fetch(&self, names: Option<&[String]>) -> Variables {
        match names {
            None => self.variables.clone(),
            Some(names) => self
                .variables
                .iter()
                .filter(|(k, _)| names.iter().any(|n| n == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Job(key={}, type={})", self.key, self.job_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> Variables {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn fetch_all_variables_by_default() {
        let job = Job::new(1, "test", vars(json!({"a": 1, "b": 2})));
        assert_eq!(job.variables_to_fetch(None).len(), 2);
    }

    #[test]
    fn fetch_only_named_variables() {
        let job = Job::new(1, "test", vars(json!({"a": 1, "b": 2})));
        let names = vec!["b".to_string(), "missing".to_string()];
        let fetched = job.variables_to_fetch(Some(&names));
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched["b"], json!(2));
    }

    #[test]
    fn serializes_type_field() {
        let job = Job::new(42, "payment", Variables::new()).with_worker("w1");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["type"], "payment");
        assert_eq!(json["key"], 42);
        assert_eq!(json["worker"], "w1");
    }

    #[test]
    fn display_names_key_and_type() {
        let job = Job::new(5, "test", Variables::new());
        assert_eq!(job.to_string(), "Job(key=5, type=test)");
    }
}
