//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker pool and pipeline settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Workers draining the render queue
    pub render_workers: usize,
    pub render_queue_capacity: usize,
    /// Workers draining the narrative (AI task) queue
    pub narrative_workers: usize,
    pub narrative_queue_capacity: usize,
    /// Parent directory for per-job scratch directories
    pub work_dir: PathBuf,
    /// Total attempts at the script step
    pub script_max_attempts: u32,
    /// Fixed pause between script attempts
    pub script_retry_delay: Duration,
    /// Display time per panel image in the narrated video
    pub slideshow_image_seconds: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            render_workers: 4,
            render_queue_capacity: 100,
            narrative_workers: 4,
            narrative_queue_capacity: 100,
            work_dir: std::env::temp_dir(),
            script_max_attempts: 3,
            script_retry_delay: Duration::from_secs(2),
            slideshow_image_seconds: 3,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            render_workers: std::env::var("RENDER_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            render_queue_capacity: std::env::var("RENDER_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            narrative_workers: std::env::var("NARRATIVE_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            narrative_queue_capacity: std::env::var("NARRATIVE_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            script_max_attempts: std::env::var("SCRIPT_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            script_retry_delay: Duration::from_millis(
                std::env::var("SCRIPT_RETRY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            slideshow_image_seconds: std::env::var("SLIDESHOW_IMAGE_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
        }
    }
}
