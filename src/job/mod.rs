//! Jobs — activated work items and their outcome reporting.

pub mod controller;
pub mod model;
pub mod status;

pub use controller::JobController;
pub use model::{Job, Variables};
pub use status::JobStatus;
