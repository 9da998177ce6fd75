//! Bounded in-process task queue with a fixed worker pool.

use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{QueueError, QueueResult};

/// Intake side of a task queue.
///
/// Implementations must never drop an accepted item silently: `enqueue`
/// waits for room and `try_enqueue` rejects with [`QueueError::Full`].
#[async_trait]
pub trait TaskQueue<T: Send + 'static>: Send + Sync {
    /// Add an item, waiting until the buffer has room.
    async fn enqueue(&self, item: T) -> QueueResult<()>;

    /// Add an item without waiting.
    fn try_enqueue(&self, item: T) -> QueueResult<()>;

    /// Maximum number of buffered items.
    fn capacity(&self) -> usize;

    /// Number of items currently buffered.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Work performed for each dequeued item.
#[async_trait]
pub trait TaskHandler<T>: Send + Sync + 'static {
    type Error: Display + Send;

    async fn handle(&self, item: T) -> Result<(), Self::Error>;
}

/// Tokio-channel backed queue. Dequeue order is FIFO.
pub struct MemoryTaskQueue<T> {
    name: String,
    sender: mpsc::Sender<T>,
    receiver: Arc<Mutex<mpsc::Receiver<T>>>,
    capacity: usize,
}

impl<T: Send + 'static> MemoryTaskQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            name: name.into(),
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            capacity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn `worker_count` workers draining this queue through `handler`.
    ///
    /// Each worker runs one item to completion before taking the next.
    /// Handler errors and panics are logged; the worker moves on. Items are
    /// never retried or re-enqueued.
    pub fn start<H>(&self, worker_count: usize, handler: Arc<H>) -> WorkerPool
    where
        H: TaskHandler<T>,
    {
        let worker_count = worker_count.max(1);
        let (shutdown, _) = watch::channel(false);

        info!(
            queue = %self.name,
            workers = worker_count,
            capacity = self.capacity,
            "Starting worker pool"
        );

        let workers = (0..worker_count)
            .map(|index| {
                let receiver = Arc::clone(&self.receiver);
                let handler = Arc::clone(&handler);
                let shutdown_rx = shutdown.subscribe();
                let queue = self.name.clone();
                tokio::spawn(run_worker(queue, index, receiver, handler, shutdown_rx))
            })
            .collect();

        let receiver = Arc::clone(&self.receiver);
        let close_intake = async move { receiver.lock().await.close() }.boxed();

        WorkerPool {
            name: self.name.clone(),
            close_intake,
            shutdown,
            workers,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> TaskQueue<T> for MemoryTaskQueue<T> {
    async fn enqueue(&self, item: T) -> QueueResult<()> {
        self.sender
            .send(item)
            .await
            .map_err(|_| QueueError::Closed(self.name.clone()))?;
        metrics::counter!("vidcraft_tasks_enqueued_total", "queue" => self.name.clone()).increment(1);
        Ok(())
    }

    fn try_enqueue(&self, item: T) -> QueueResult<()> {
        match self.sender.try_send(item) {
            Ok(()) => {
                metrics::counter!("vidcraft_tasks_enqueued_total", "queue" => self.name.clone())
                    .increment(1);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(queue = %self.name, capacity = self.capacity, "Queue full, rejecting task");
                metrics::counter!("vidcraft_queue_rejections_total", "queue" => self.name.clone())
                    .increment(1);
                Err(QueueError::full(self.name.clone(), self.capacity))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed(self.name.clone())),
        }
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }
}

async fn run_worker<T, H>(
    queue: String,
    index: usize,
    receiver: Arc<Mutex<mpsc::Receiver<T>>>,
    handler: Arc<H>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    T: Send + 'static,
    H: TaskHandler<T>,
{
    debug!(queue = %queue, worker = index, "Worker started");

    loop {
        let next = tokio::select! {
            _ = shutdown_rx.changed() => None,
            item = async { receiver.lock().await.recv().await } => item,
        };

        let Some(item) = next else {
            break;
        };

        match AssertUnwindSafe(handler.handle(item)).catch_unwind().await {
            Ok(Ok(())) => {
                metrics::counter!("vidcraft_tasks_handled_total", "queue" => queue.clone(), "outcome" => "ok")
                    .increment(1);
            }
            Ok(Err(e)) => {
                error!(queue = %queue, worker = index, error = %e, "Task handler failed");
                metrics::counter!("vidcraft_tasks_handled_total", "queue" => queue.clone(), "outcome" => "error")
                    .increment(1);
            }
            Err(_) => {
                error!(queue = %queue, worker = index, "Task handler panicked");
                metrics::counter!("vidcraft_tasks_handled_total", "queue" => queue.clone(), "outcome" => "panic")
                    .increment(1);
            }
        }
    }

    debug!(queue = %queue, worker = index, "Worker stopped");
}

/// Handle to a running set of workers.
pub struct WorkerPool {
    name: String,
    close_intake: BoxFuture<'static, ()>,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop the pool.
    ///
    /// Intake is closed and workers are aborted. Items still buffered and
    /// items being handled are lost.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for worker in &self.workers {
            worker.abort();
        }
        for worker in self.workers {
            if let Err(e) = worker.await {
                if !e.is_cancelled() {
                    warn!(queue = %self.name, error = %e, "Worker exited abnormally");
                }
            }
        }
        self.close_intake.await;
        info!(queue = %self.name, "Worker pool stopped");
    }
}
