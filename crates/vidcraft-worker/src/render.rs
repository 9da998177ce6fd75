//! Render engine.
//!
//! Turns a project timeline into one composited video: every distinct
//! material is downloaded once into a per-job scratch directory, the visual
//! clips are composited in a single FFmpeg invocation, and the result is
//! uploaded under `<user_id>/<render_id>.<ext>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vidcraft_media::{ClipSource, CompositionClip, MediaCompositor, TimelineComposition};
use vidcraft_models::{
    ProjectTimeline, Render, RenderFormat, RenderId, RenderQuality, TaskStatus, TrackKind,
};
use vidcraft_queue::{TaskHandler, TaskQueue};
use vidcraft_storage::{ArtifactStore, DOWNLOAD_URL_TTL};

use crate::catalog::{
    MaterialRepository, MemoryCatalog, ProjectRepository, RenderFilter, RenderPage,
    RenderRepository,
};
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Body of a render submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRenderRequest {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub quality: Option<RenderQuality>,
    /// Container name (`mp4`, `avi`, `mov`, `mkv`)
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
}

/// Polling view of a render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderProgress {
    pub status: TaskStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Repositories the render engine reads and writes.
#[derive(Clone)]
pub struct RenderCatalog {
    pub projects: Arc<dyn ProjectRepository>,
    pub materials: Arc<dyn MaterialRepository>,
    pub renders: Arc<dyn RenderRepository>,
}

impl RenderCatalog {
    /// Use one in-memory catalog for all three repositories.
    pub fn from_memory(catalog: Arc<MemoryCatalog>) -> Self {
        Self {
            projects: catalog.clone(),
            materials: catalog.clone(),
            renders: catalog,
        }
    }
}

pub struct RenderService {
    catalog: RenderCatalog,
    store: Arc<dyn ArtifactStore>,
    compositor: Arc<dyn MediaCompositor>,
    queue: Arc<dyn TaskQueue<RenderId>>,
    work_dir: PathBuf,
}

impl RenderService {
    pub fn new(
        catalog: RenderCatalog,
        store: Arc<dyn ArtifactStore>,
        compositor: Arc<dyn MediaCompositor>,
        queue: Arc<dyn TaskQueue<RenderId>>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            store,
            compositor,
            queue,
            work_dir: work_dir.into(),
        }
    }

    /// Create a pending render for an owned project and queue it.
    ///
    /// A full queue marks the fresh record failed and returns the queue error.
    pub async fn create_render(&self, user_id: &str, request: CreateRenderRequest) -> WorkerResult<Render> {
        if request.project_id.trim().is_empty() {
            return Err(WorkerError::invalid_request("project_id is required"));
        }
        if request.name.trim().is_empty() {
            return Err(WorkerError::invalid_request("name is required"));
        }
        let format = match request.format.as_deref() {
            None => RenderFormat::default(),
            Some(raw) => RenderFormat::parse(raw)
                .ok_or_else(|| WorkerError::invalid_request(format!("unsupported format: {}", raw)))?,
        };

        let project = self
            .catalog
            .projects
            .get_project(&request.project_id)
            .await?
            .ok_or_else(|| WorkerError::not_found("project", &request.project_id))?;
        if project.user_id != user_id {
            return Err(WorkerError::forbidden("project belongs to another user"));
        }

        let mut render = Render::new(user_id, &project.id, request.name.trim())
            .with_format(format)
            .with_quality(request.quality.unwrap_or_default())
            .with_resolution(request.resolution);
        self.catalog.renders.create_render(&render).await?;

        if let Err(e) = self.queue.try_enqueue(render.id.clone()) {
            warn!(render_id = %render.id, "Rejected render: {}", e);
            let reason = if e.is_full() {
                "render queue is full".to_string()
            } else {
                format!("failed to queue render: {}", e)
            };
            render.fail(reason)?;
            self.catalog.renders.update_render(&render).await?;
            return Err(e.into());
        }

        info!(
            render_id = %render.id,
            project_id = %render.project_id,
            user_id = %user_id,
            "Queued render"
        );
        Ok(render)
    }

    /// Fetch a render owned by `user_id`.
    pub async fn get_render(&self, user_id: &str, render_id: &RenderId) -> WorkerResult<Render> {
        let render = self
            .catalog
            .renders
            .get_render(render_id)
            .await?
            .ok_or_else(|| WorkerError::not_found("render", render_id.as_str()))?;
        if render.user_id != user_id {
            return Err(WorkerError::forbidden("render belongs to another user"));
        }
        Ok(render)
    }

    pub async fn get_render_status(&self, user_id: &str, render_id: &RenderId) -> WorkerResult<RenderProgress> {
        let render = self.get_render(user_id, render_id).await?;
        Ok(RenderProgress {
            status: render.status,
            progress: render.progress,
            error: render.error,
        })
    }

    pub async fn list_renders(&self, user_id: &str, filter: &RenderFilter) -> WorkerResult<RenderPage> {
        self.catalog.renders.list_renders(user_id, filter).await
    }

    /// Remove a render record, and its artifact when one was published.
    pub async fn delete_render(&self, user_id: &str, render_id: &RenderId) -> WorkerResult<()> {
        let render = self.get_render(user_id, render_id).await?;

        if render.status == TaskStatus::Completed {
            if let Some(key) = render.output_path.as_deref() {
                if let Err(e) = self.store.delete_object(key).await {
                    warn!(render_id = %render.id, key = %key, "Failed to delete render output: {}", e);
                }
            }
        }

        self.catalog.renders.delete_render(render_id).await?;
        info!(render_id = %render.id, "Deleted render");
        Ok(())
    }

    /// Presigned download URL for a completed render.
    pub async fn download_render(&self, user_id: &str, render_id: &RenderId) -> WorkerResult<String> {
        let render = self.get_render(user_id, render_id).await?;
        if render.status != TaskStatus::Completed {
            return Err(WorkerError::invalid_request(format!(
                "render is not completed (status: {})",
                render.status
            )));
        }
        let key = render
            .output_path
            .as_deref()
            .ok_or_else(|| WorkerError::not_found("render output", render_id.as_str()))?;

        Ok(self.store.presign_get(key, DOWNLOAD_URL_TTL).await?)
    }

    /// Run one render to a terminal state.
    ///
    /// Fatal errors are written to the record before being returned.
    pub async fn process(&self, render_id: &RenderId) -> WorkerResult<()> {
        let mut render = self
            .catalog
            .renders
            .get_render(render_id)
            .await?
            .ok_or_else(|| WorkerError::not_found("render", render_id.as_str()))?;
        if render.is_terminal() {
            warn!(render_id = %render_id, status = %render.status, "Skipping finished render");
            return Ok(());
        }

        let logger = JobLogger::new(&render.id, "render");
        logger.log_start(&format!("project {} ({})", render.project_id, render.format.extension()));
        let started = Instant::now();

        render.start()?;
        self.catalog.renders.update_render(&render).await?;

        match self.execute(&mut render, &logger).await {
            Ok(()) => {
                counter!("vidcraft_renders_total", "outcome" => "completed").increment(1);
                histogram!("vidcraft_render_duration_seconds").record(started.elapsed().as_secs_f64());
                logger.log_completion(&format!(
                    "{} bytes, {:.2}s of video",
                    render.output_size, render.duration
                ));
                Ok(())
            }
            Err(e) => {
                counter!("vidcraft_renders_total", "outcome" => "failed").increment(1);
                let message = e.to_string();
                logger.log_error(&message);
                if !render.is_terminal() {
                    render.fail(message)?;
                    self.catalog.renders.update_render(&render).await?;
                }
                Err(e)
            }
        }
    }

    /// Run the render stages in order: resolve the project and parse its
    /// timeline, reject timelines with no visual clips, download materials
    /// (30), build the filter graph, composite (50, then 80), probe, upload.
    /// The visual-clip check runs before any download, so such renders fail
    /// at progress 0 without touching storage.
    async fn execute(&self, render: &mut Render, logger: &JobLogger) -> WorkerResult<()> {
        let project = self
            .catalog
            .projects
            .get_project(&render.project_id)
            .await?
            .ok_or_else(|| {
                WorkerError::processing_failed(format!("project not found: {}", render.project_id))
            })?;
        let timeline = project
            .timeline()
            .map_err(|e| WorkerError::processing_failed(format!("failed to parse project timeline: {}", e)))?;
        if timeline.visual_clips().is_empty() {
            return Err(WorkerError::processing_failed(
                "project timeline has no video or image clips",
            ));
        }

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("render-{}-", render.id))
            .tempdir_in(&self.work_dir)?;

        let local = self
            .download_materials(&timeline, scratch.path())
            .await
            .map_err(|e| WorkerError::processing_failed(format!("failed to download materials: {}", e)))?;
        self.checkpoint(render, 30, logger, "materials downloaded").await?;

        let composition = build_composition(&timeline, &local, render.resolution.clone())?;
        composition
            .filter_plan()
            .map_err(|e| WorkerError::processing_failed(format!("failed to build ffmpeg command: {}", e)))?;

        let output = scratch
            .path()
            .join(format!("output.{}", render.format.extension()));
        self.checkpoint(render, 50, logger, "compositing").await?;
        self.compositor
            .compose_timeline(&composition, &output)
            .await
            .map_err(|e| WorkerError::processing_failed(format!("ffmpeg execution failed: {}", e)))?;
        self.checkpoint(render, 80, logger, "composited").await?;

        let duration = match self.compositor.probe_duration(&output).await {
            Ok(d) => d,
            Err(e) => {
                logger.log_warning(&format!("could not probe output duration: {}", e));
                0.0
            }
        };
        let size = tokio::fs::metadata(&output)
            .await
            .map_err(|e| WorkerError::processing_failed(format!("failed to read output: {}", e)))?
            .len();

        let key = render.output_key();
        self.store
            .upload_file(&output, &key, render.format.content_type())
            .await
            .map_err(|e| WorkerError::processing_failed(format!("failed to upload output: {}", e)))?;

        render.complete(key, size, duration)?;
        self.catalog.renders.update_render(render).await?;
        Ok(())
    }

    /// Download each distinct material once. Returns material id → local path.
    async fn download_materials(
        &self,
        timeline: &ProjectTimeline,
        dir: &Path,
    ) -> WorkerResult<HashMap<String, PathBuf>> {
        let mut local = HashMap::new();

        for (index, material_id) in timeline.material_ids().into_iter().enumerate() {
            let material = self
                .catalog
                .materials
                .get_material(&material_id)
                .await?
                .ok_or_else(|| WorkerError::not_found("material", &material_id))?;

            let file_name = match material.extension() {
                Some(ext) => format!("material_{}.{}", index, ext),
                None => format!("material_{}", index),
            };
            let path = dir.join(file_name);
            self.store.download_file(&material.file_path, &path).await?;
            local.insert(material_id, path);
        }

        Ok(local)
    }

    async fn checkpoint(
        &self,
        render: &mut Render,
        progress: u8,
        logger: &JobLogger,
        message: &str,
    ) -> WorkerResult<()> {
        render.advance(progress)?;
        self.catalog.renders.update_render(render).await?;
        logger.log_progress(progress, message);
        Ok(())
    }
}

/// Visual clips in track order, resolved against downloaded files.
fn build_composition(
    timeline: &ProjectTimeline,
    local: &HashMap<String, PathBuf>,
    resolution: Option<String>,
) -> WorkerResult<TimelineComposition> {
    let clips = timeline
        .visual_clips()
        .into_iter()
        .map(|(kind, clip)| {
            let path = local.get(&clip.material_id).cloned().ok_or_else(|| {
                WorkerError::processing_failed(format!("material not downloaded: {}", clip.material_id))
            })?;
            Ok(CompositionClip {
                source: match kind {
                    TrackKind::Image => ClipSource::Image,
                    _ => ClipSource::Video,
                },
                path,
                start: clip.start,
                duration: clip.duration(),
                effects: clip.effects.clone(),
            })
        })
        .collect::<WorkerResult<Vec<_>>>()?;

    Ok(TimelineComposition::new(clips)
        .with_resolution(resolution.or_else(|| timeline.resolution.clone()))
        .with_frame_rate(timeline.frame_rate))
}

#[async_trait]
impl TaskHandler<RenderId> for RenderService {
    type Error = WorkerError;

    async fn handle(&self, render_id: RenderId) -> Result<(), WorkerError> {
        self.process(&render_id).await
    }
}
