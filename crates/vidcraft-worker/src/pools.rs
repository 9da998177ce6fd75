//! Queue and worker pool wiring for both pipelines.

use std::sync::Arc;

use tracing::info;

use vidcraft_media::MediaCompositor;
use vidcraft_models::{RenderId, Task};
use vidcraft_queue::{MemoryTaskQueue, StatusStore, WorkerPool};
use vidcraft_storage::ArtifactStore;

use crate::config::WorkerConfig;
use crate::narrative::{NarrativeBackends, NarrativePipeline, NarrativeSettings};
use crate::render::{RenderCatalog, RenderService};

/// Shared collaborators for both pipelines.
#[derive(Clone)]
pub struct WorkerDeps {
    pub catalog: RenderCatalog,
    pub store: Arc<dyn ArtifactStore>,
    pub compositor: Arc<dyn MediaCompositor>,
    pub status: Arc<dyn StatusStore>,
    pub backends: NarrativeBackends,
}

/// The render and narrative services with their running pools.
pub struct Workers {
    pub render: Arc<RenderService>,
    pub narrative: Arc<NarrativePipeline>,
    render_pool: WorkerPool,
    narrative_pool: WorkerPool,
}

impl Workers {
    /// Build both queues and start their pools. Must run inside a tokio runtime.
    pub fn start(config: &WorkerConfig, deps: WorkerDeps) -> Self {
        let render_queue = Arc::new(MemoryTaskQueue::<RenderId>::new(
            "render",
            config.render_queue_capacity,
        ));
        let narrative_queue = Arc::new(MemoryTaskQueue::<Task>::new(
            "narrative",
            config.narrative_queue_capacity,
        ));

        let render = Arc::new(RenderService::new(
            deps.catalog,
            Arc::clone(&deps.store),
            Arc::clone(&deps.compositor),
            render_queue.clone(),
            config.work_dir.clone(),
        ));
        let narrative = Arc::new(NarrativePipeline::new(
            deps.backends,
            deps.compositor,
            deps.store,
            deps.status,
            narrative_queue.clone(),
            NarrativeSettings::from(config),
        ));

        let render_pool = render_queue.start(config.render_workers, Arc::clone(&render));
        let narrative_pool = narrative_queue.start(config.narrative_workers, Arc::clone(&narrative));

        info!(
            render_workers = render_pool.worker_count(),
            narrative_workers = narrative_pool.worker_count(),
            work_dir = %config.work_dir.display(),
            "Worker pools started"
        );

        Self {
            render,
            narrative,
            render_pool,
            narrative_pool,
        }
    }

    /// Stop both pools. Queued and in-flight jobs are abandoned.
    pub async fn shutdown(self) {
        tokio::join!(self.render_pool.shutdown(), self.narrative_pool.shutdown());
        info!("Worker pools stopped");
    }
}
