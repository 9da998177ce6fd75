//! In-memory fakes shared by the worker integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vidcraft_ai::{AiError, AiResult, GeneratedAudio, GeneratedImage, ImageGenerator, SpeechSynthesizer, TextGenerator};
use vidcraft_media::{MediaCompositor, MediaError, MediaResult, SlideshowComposition, TimelineComposition};
use vidcraft_models::{Material, Project, Render, RenderId, Task, TaskId, TaskStatus};
use vidcraft_queue::{MemoryStatusStore, MemoryTaskQueue, QueueResult, StatusStore};
use vidcraft_storage::{ArtifactStore, MemoryArtifactStore, StorageError, StorageResult};
use vidcraft_worker::{
    MemoryCatalog, NarrativeBackends, NarrativePipeline, NarrativeSettings, RenderCatalog,
    RenderFilter, RenderPage, RenderRepository, RenderService, RetryConfig, WorkerResult,
};

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0, 0, 0, 0];
pub const WAV: &[u8] = b"RIFF\0\0\0\0WAVEfmt ";

/// Compositor that writes a placeholder output and remembers what it was asked.
#[derive(Default)]
pub struct FakeCompositor {
    pub timelines: Mutex<Vec<TimelineComposition>>,
    pub slideshows: Mutex<Vec<SlideshowComposition>>,
    pub fail_with: Option<String>,
    pub probe_fails: bool,
}

impl FakeCompositor {
    pub fn failing(stderr: &str) -> Self {
        Self {
            fail_with: Some(stderr.to_string()),
            ..Default::default()
        }
    }

    pub fn last_timeline(&self) -> TimelineComposition {
        self.timelines.lock().unwrap().last().cloned().expect("no timeline composed")
    }

    fn result(&self) -> MediaResult<()> {
        match &self.fail_with {
            Some(stderr) => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr.clone()),
                Some(1),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MediaCompositor for FakeCompositor {
    async fn compose_timeline(&self, composition: &TimelineComposition, output: &Path) -> MediaResult<()> {
        composition.build_command(output)?;
        self.timelines.lock().unwrap().push(composition.clone());
        self.result()?;
        tokio::fs::write(output, b"composited video").await?;
        Ok(())
    }

    async fn compose_slideshow(
        &self,
        slideshow: &SlideshowComposition,
        work_dir: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        slideshow.write_list(work_dir.join("images.txt")).await?;
        self.slideshows.lock().unwrap().push(slideshow.clone());
        self.result()?;
        tokio::fs::write(output, b"slideshow video").await?;
        Ok(())
    }

    async fn probe_duration(&self, _path: &Path) -> MediaResult<f64> {
        if self.probe_fails {
            return Err(MediaError::FfprobeFailed {
                message: "no duration".to_string(),
                stderr: None,
            });
        }
        Ok(12.5)
    }
}

/// Text backend replaying canned replies; the last reply repeats.
pub struct ScriptedText {
    replies: Mutex<VecDeque<AiResult<String>>>,
    last: String,
    pub calls: AtomicUsize,
}

impl ScriptedText {
    pub fn new(replies: Vec<&str>) -> Self {
        let last = replies.last().copied().unwrap_or_default().to_string();
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            last,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn generate(&self, _prompt: &str) -> AiResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.last.clone()))
    }
}

/// Text backend whose every call errors.
#[derive(Default)]
pub struct BrokenText {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for BrokenText {
    async fn generate(&self, _prompt: &str) -> AiResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AiError::invalid_response("ollama", "connection reset"))
    }
}

/// Image backend that records prompts and can fail on one panel (1-indexed).
#[derive(Default)]
pub struct FakeImages {
    pub prompts: Mutex<Vec<String>>,
    pub fail_on: Option<usize>,
}

impl FakeImages {
    pub fn failing_on(panel: usize) -> Self {
        Self {
            fail_on: Some(panel),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn text_to_image(&self, prompt: &str) -> AiResult<GeneratedImage> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        if self.fail_on == Some(call) {
            return Err(AiError::invalid_response("stable-diffusion", "out of memory"));
        }
        Ok(GeneratedImage::new(PNG.to_vec()))
    }
}

#[derive(Default)]
pub struct FakeSpeech {
    pub texts: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str) -> AiResult<GeneratedAudio> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(AiError::invalid_response("tts", "voice unavailable"));
        }
        Ok(GeneratedAudio::new(WAV.to_vec(), "audio/wav"))
    }
}

/// Artifact store whose uploads fail; reads go to the inner store.
#[derive(Default)]
pub struct UploadFailingStore {
    pub inner: MemoryArtifactStore,
}

#[async_trait]
impl ArtifactStore for UploadFailingStore {
    async fn upload_file(&self, _path: &Path, key: &str, _content_type: &str) -> StorageResult<()> {
        Err(StorageError::upload_failed(format!("{}: bucket unavailable", key)))
    }

    async fn upload_bytes(&self, _data: Vec<u8>, key: &str, _content_type: &str) -> StorageResult<()> {
        Err(StorageError::upload_failed(format!("{}: bucket unavailable", key)))
    }

    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()> {
        self.inner.download_file(key, path).await
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        self.inner.presign_get(key, expires_in).await
    }

    async fn object_url(&self, key: &str) -> StorageResult<String> {
        self.inner.object_url(key).await
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.inner.delete_object(key).await
    }
}

/// Status store that keeps every write for later inspection.
#[derive(Default)]
pub struct RecordingStatusStore {
    pub inner: MemoryStatusStore,
    pub history: Mutex<Vec<Task>>,
}

impl RecordingStatusStore {
    pub fn history_of(&self, id: &TaskId) -> Vec<(TaskStatus, u8)> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|t| &t.id == id)
            .map(|t| (t.status, t.progress))
            .collect()
    }
}

#[async_trait]
impl StatusStore for RecordingStatusStore {
    async fn put(&self, task: &Task) -> QueueResult<()> {
        self.history.lock().unwrap().push(task.clone());
        self.inner.put(task).await
    }

    async fn get(&self, id: &TaskId) -> QueueResult<Option<Task>> {
        self.inner.get(id).await
    }
}

/// Render repository that keeps every update for later inspection.
pub struct RecordingRenders {
    pub inner: Arc<MemoryCatalog>,
    pub history: Mutex<Vec<(TaskStatus, u8)>>,
}

#[async_trait]
impl RenderRepository for RecordingRenders {
    async fn create_render(&self, render: &Render) -> WorkerResult<()> {
        self.history.lock().unwrap().push((render.status, render.progress));
        self.inner.create_render(render).await
    }

    async fn get_render(&self, render_id: &RenderId) -> WorkerResult<Option<Render>> {
        self.inner.get_render(render_id).await
    }

    async fn update_render(&self, render: &Render) -> WorkerResult<()> {
        self.history.lock().unwrap().push((render.status, render.progress));
        self.inner.update_render(render).await
    }

    async fn delete_render(&self, render_id: &RenderId) -> WorkerResult<bool> {
        self.inner.delete_render(render_id).await
    }

    async fn list_renders(&self, user_id: &str, filter: &RenderFilter) -> WorkerResult<RenderPage> {
        self.inner.list_renders(user_id, filter).await
    }
}

pub fn assert_monotonic(history: &[(TaskStatus, u8)]) {
    for pair in history.windows(2) {
        assert!(
            pair[1].1 >= pair[0].1,
            "progress went backwards: {:?}",
            history
        );
        assert!(
            !pair[0].0.is_terminal(),
            "record changed after reaching a terminal state: {:?}",
            history
        );
    }
}

pub fn fast_settings(work_dir: &Path) -> NarrativeSettings {
    NarrativeSettings {
        script_retry: RetryConfig::new("script generation")
            .with_max_attempts(3)
            .with_delay(Duration::from_millis(1)),
        seconds_per_image: 3,
        work_dir: work_dir.to_path_buf(),
    }
}

/// A narrative pipeline over fakes, with an unstarted queue.
pub struct NarrativeHarness {
    pub pipeline: Arc<NarrativePipeline>,
    pub queue: Arc<MemoryTaskQueue<Task>>,
    pub status: Arc<RecordingStatusStore>,
    pub compositor: Arc<FakeCompositor>,
    pub work_dir: tempfile::TempDir,
}

impl NarrativeHarness {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self::with_capacity(text, images, speech, store, 16)
    }

    pub fn with_capacity(
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
        store: Arc<dyn ArtifactStore>,
        capacity: usize,
    ) -> Self {
        let work_dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(MemoryTaskQueue::new("narrative", capacity));
        let status = Arc::new(RecordingStatusStore::default());
        let compositor = Arc::new(FakeCompositor::default());
        let pipeline = Arc::new(NarrativePipeline::new(
            NarrativeBackends {
                text,
                image: images,
                speech,
            },
            compositor.clone(),
            store,
            status.clone(),
            queue.clone(),
            fast_settings(work_dir.path()),
        ));
        Self {
            pipeline,
            queue,
            status,
            compositor,
            work_dir,
        }
    }

    pub async fn record(&self, id: &TaskId) -> Task {
        self.status.get(id).await.unwrap().expect("task record missing")
    }
}

/// A render service over an in-memory catalog and store, with an unstarted queue.
pub struct RenderHarness {
    pub service: Arc<RenderService>,
    pub catalog: Arc<MemoryCatalog>,
    pub renders: Arc<RecordingRenders>,
    pub store: Arc<MemoryArtifactStore>,
    pub compositor: Arc<FakeCompositor>,
    pub queue: Arc<MemoryTaskQueue<RenderId>>,
    pub work_dir: tempfile::TempDir,
}

impl RenderHarness {
    pub async fn new(compositor: FakeCompositor) -> Self {
        Self::with_capacity(compositor, 16).await
    }

    pub async fn with_capacity(compositor: FakeCompositor, capacity: usize) -> Self {
        let work_dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(MemoryCatalog::new());
        let renders = Arc::new(RecordingRenders {
            inner: catalog.clone(),
            history: Mutex::new(Vec::new()),
        });
        let store = Arc::new(MemoryArtifactStore::new());
        let compositor = Arc::new(compositor);
        let queue = Arc::new(MemoryTaskQueue::new("render", capacity));

        let service = Arc::new(RenderService::new(
            RenderCatalog {
                projects: catalog.clone(),
                materials: catalog.clone(),
                renders: renders.clone(),
            },
            store.clone(),
            compositor.clone(),
            queue.clone(),
            work_dir.path(),
        ));

        for (id, file_name) in [("m-video", "beach.MP4"), ("m-still", "sunset.png"), ("m-music", "song.mp3")] {
            let key = format!("materials/{}/{}", id, file_name);
            store.insert(key.clone(), b"material bytes".to_vec()).await;
            catalog
                .insert_material(Material {
                    id: id.to_string(),
                    name: id.to_string(),
                    file_name: file_name.to_string(),
                    file_path: key,
                })
                .await;
        }

        Self {
            service,
            catalog,
            renders,
            store,
            compositor,
            queue,
            work_dir,
        }
    }

    pub async fn add_project(&self, id: &str, user_id: &str, config: serde_json::Value) {
        self.catalog
            .insert_project(Project {
                id: id.to_string(),
                user_id: user_id.to_string(),
                name: format!("Project {}", id),
                config,
            })
            .await;
    }

    pub async fn record(&self, id: &RenderId) -> Render {
        self.catalog.get_render(id).await.unwrap().expect("render missing")
    }
}
