//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("{queue} queue is full (capacity {capacity})")]
    Full { queue: String, capacity: usize },

    #[error("{0} queue is closed")]
    Closed(String),

    #[error("Status store error: {0}")]
    Store(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn full(queue: impl Into<String>, capacity: usize) -> Self {
        Self::Full {
            queue: queue.into(),
            capacity,
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether the error is a capacity rejection the caller may surface as "busy".
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full { .. })
    }
}
