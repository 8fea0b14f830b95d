pub mod config;
pub mod error;
pub mod queue;
pub mod registry;

pub use config::QueueConfig;
pub use error::QueueError;
pub use queue::{ExecutionQueue, JobLease, RESULT_BUFFER_SIZE};
