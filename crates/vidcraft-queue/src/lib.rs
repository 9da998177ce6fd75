//! Task intake and status tracking.
//!
//! This crate provides:
//! - A bounded FIFO task queue drained by a fixed pool of async workers
//! - A key-value status store for generic task records (Redis or in-memory)
//!
//! Delivery is at-most-once: items buffered or in flight when the process
//! stops are lost.

pub mod error;
pub mod queue;
pub mod status;

pub use error::{QueueError, QueueResult};
pub use queue::{MemoryTaskQueue, TaskHandler, TaskQueue, WorkerPool};
pub use status::{
    status_key, MemoryStatusStore, RedisStatusStore, StatusStore, StatusStoreConfig,
    DEFAULT_STATUS_TTL_SECS,
};
