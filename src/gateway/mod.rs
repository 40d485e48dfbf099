//! Gateway boundary — where job outcomes leave the worker.

pub mod memory;
pub mod traits;

pub use memory::{GatewayReport, InMemoryGateway};
pub use traits::JobGateway;
