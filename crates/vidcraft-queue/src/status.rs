//! Task status store.
//!
//! Generic task records live in a key-value store under `task:<id>:status`
//! with a TTL. Records are never deleted explicitly; they expire.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, info};

use vidcraft_models::{Task, TaskId};

use crate::error::QueueResult;

/// Default record lifetime (24 hours).
pub const DEFAULT_STATUS_TTL_SECS: u64 = 86_400;

/// Key a task record is stored under.
pub fn status_key(id: &TaskId) -> String {
    format!("task:{}:status", id)
}

/// Status store configuration.
#[derive(Debug, Clone)]
pub struct StatusStoreConfig {
    /// Redis URL. `None` selects the in-memory store.
    pub redis_url: Option<String>,
    /// Record lifetime
    pub ttl: Duration,
}

impl Default for StatusStoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl: Duration::from_secs(DEFAULT_STATUS_TTL_SECS),
        }
    }
}

impl StatusStoreConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty()),
            ttl: Duration::from_secs(
                std::env::var("TASK_STATUS_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_STATUS_TTL_SECS),
            ),
        }
    }

    /// Build the configured store.
    pub fn build(&self) -> QueueResult<Arc<dyn StatusStore>> {
        match &self.redis_url {
            Some(url) => {
                info!("Using Redis task status store");
                Ok(Arc::new(RedisStatusStore::new(url, self.ttl)?))
            }
            None => {
                info!("REDIS_URL not set, using in-memory task status store");
                Ok(Arc::new(MemoryStatusStore::new(self.ttl)))
            }
        }
    }
}

/// Persistence for generic task records.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Write the full record, refreshing its TTL.
    async fn put(&self, task: &Task) -> QueueResult<()>;

    /// Read a record. `None` when unknown or expired.
    async fn get(&self, id: &TaskId) -> QueueResult<Option<Task>>;
}

/// Redis-backed store (`SET key json EX ttl`).
pub struct RedisStatusStore {
    client: redis::Client,
    ttl: Duration,
}

impl RedisStatusStore {
    pub fn new(redis_url: &str, ttl: Duration) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client, ttl })
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn put(&self, task: &Task) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(task)?;
        let key = status_key(&task.id);

        debug!(task_id = %task.id, status = %task.status, progress = task.progress, "Writing task status");
        conn.set_ex::<_, _, ()>(&key, payload, self.ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> QueueResult<Option<Task>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(status_key(id)).await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

/// Process-local store. Expiry is checked on read and expired records are
/// swept on every write.
pub struct MemoryStatusStore {
    entries: RwLock<HashMap<String, (Task, Option<Instant>)>>,
    ttl: Duration,
}

impl MemoryStatusStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of records held, expired ones included until the next write.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// `None` when the TTL is too large to represent; such records never expire.
    fn expiry_from(&self, now: Instant) -> Option<Instant> {
        now.checked_add(self.ttl)
    }
}

fn is_live(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.map_or(true, |at| now < at)
}

impl Default for MemoryStatusStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_STATUS_TTL_SECS))
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn put(&self, task: &Task) -> QueueResult<()> {
        let now = Instant::now();
        let expires_at = self.expiry_from(now);

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, at)| is_live(*at, now));
        let swept = before - entries.len();
        if swept > 0 {
            debug!(swept, "Swept expired task records");
        }
        entries.insert(status_key(&task.id), (task.clone(), expires_at));
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> QueueResult<Option<Task>> {
        let key = status_key(id);
        let mut entries = self.entries.write().await;
        match entries.get(&key) {
            Some((task, expires_at)) if is_live(*expires_at, Instant::now()) => Ok(Some(task.clone())),
            Some(_) => {
                entries.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
