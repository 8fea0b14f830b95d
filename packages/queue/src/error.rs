use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Broker error: {0}")]
    Broker(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
