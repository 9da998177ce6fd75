//! Narrative pipeline: story text in, narrated slideshow video out.
//!
//! Stages run strictly in order: script (retried), panel parse, one image
//! per panel, narration, speech, slideshow composition, publish. Each stage
//! writes its progress checkpoint to the status store; any fatal stage marks
//! the task failed with a message naming the stage.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use tracing::{debug, warn};

use vidcraft_ai::{ImageGenerator, SpeechSynthesizer, TextGenerator};
use vidcraft_media::{MediaCompositor, SlideshowComposition, DEFAULT_SECONDS_PER_IMAGE};
use vidcraft_models::{Task, TaskId, TaskType};
use vidcraft_queue::{StatusStore, TaskHandler, TaskQueue};
use vidcraft_storage::ArtifactStore;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::retry::{retry_async, RetryConfig};

const SCRIPT_DONE: u8 = 20;
const IMAGES_DONE: u8 = 60;
const SPEECH_DONE: u8 = 70;
const VIDEO_DONE: u8 = 90;

/// A submission accepted by [`NarrativePipeline::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeRequest {
    /// Story text straight to a narrated video
    NovelToVideo { novel: String },
    /// Premise and title to a narrated video
    NovelToAll {
        novel_prompt: String,
        title: Option<String>,
    },
    /// Premise and title to novel text only
    GenerateNovel {
        novel_prompt: String,
        title: Option<String>,
    },
}

impl NarrativeRequest {
    pub fn task_type(&self) -> TaskType {
        match self {
            NarrativeRequest::NovelToVideo { .. } | NarrativeRequest::NovelToAll { .. } => {
                TaskType::AiVideo
            }
            NarrativeRequest::GenerateNovel { .. } => TaskType::AiText,
        }
    }

    fn text(&self) -> &str {
        match self {
            NarrativeRequest::NovelToVideo { novel } => novel,
            NarrativeRequest::NovelToAll { novel_prompt, .. }
            | NarrativeRequest::GenerateNovel { novel_prompt, .. } => novel_prompt,
        }
    }

    /// Stored task params. The story text is always under `novel`.
    fn into_params(self) -> Value {
        match self {
            NarrativeRequest::NovelToVideo { novel } => json!({ "novel": novel }),
            NarrativeRequest::NovelToAll {
                novel_prompt,
                title,
            }
            | NarrativeRequest::GenerateNovel {
                novel_prompt,
                title,
            } => json!({ "novel": novel_prompt, "title": title.unwrap_or_default() }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct NovelParams {
    #[serde(default)]
    novel: String,
    #[serde(default)]
    title: Option<String>,
}

impl NovelParams {
    fn from_task(task: &Task) -> WorkerResult<Self> {
        let params: Self = serde_json::from_value(task.params.clone())
            .map_err(|e| WorkerError::processing_failed(format!("invalid task params: {}", e)))?;
        if params.novel.trim().is_empty() {
            return Err(WorkerError::processing_failed("task params have no novel text"));
        }
        Ok(params)
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Generation backends, injected at construction.
#[derive(Clone)]
pub struct NarrativeBackends {
    pub text: Arc<dyn TextGenerator>,
    pub image: Arc<dyn ImageGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}

#[derive(Debug, Clone)]
pub struct NarrativeSettings {
    pub script_retry: RetryConfig,
    pub seconds_per_image: u32,
    pub work_dir: PathBuf,
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            script_retry: RetryConfig::new("script generation"),
            seconds_per_image: DEFAULT_SECONDS_PER_IMAGE,
            work_dir: std::env::temp_dir(),
        }
    }
}

impl From<&WorkerConfig> for NarrativeSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            script_retry: RetryConfig::new("script generation")
                .with_max_attempts(config.script_max_attempts)
                .with_delay(config.script_retry_delay),
            seconds_per_image: config.slideshow_image_seconds,
            work_dir: config.work_dir.clone(),
        }
    }
}

struct PanelImage {
    path: PathBuf,
    extension: &'static str,
    content_type: &'static str,
}

/// Everything produced before publishing. Holds the scratch directory open.
struct NarrativeArtifacts {
    _scratch: TempDir,
    panels: Vec<String>,
    images: Vec<PanelImage>,
    video: PathBuf,
}

pub struct NarrativePipeline {
    backends: NarrativeBackends,
    compositor: Arc<dyn MediaCompositor>,
    store: Arc<dyn ArtifactStore>,
    status: Arc<dyn StatusStore>,
    queue: Arc<dyn TaskQueue<Task>>,
    settings: NarrativeSettings,
}

impl NarrativePipeline {
    pub fn new(
        backends: NarrativeBackends,
        compositor: Arc<dyn MediaCompositor>,
        store: Arc<dyn ArtifactStore>,
        status: Arc<dyn StatusStore>,
        queue: Arc<dyn TaskQueue<Task>>,
        settings: NarrativeSettings,
    ) -> Self {
        Self {
            backends,
            compositor,
            store,
            status,
            queue,
            settings,
        }
    }

    /// Persist a pending task and queue it.
    ///
    /// A full queue marks the record failed and returns the queue error.
    pub async fn submit(&self, request: NarrativeRequest) -> WorkerResult<Task> {
        if request.text().trim().is_empty() {
            return Err(WorkerError::invalid_request("story text is required"));
        }

        let mut task = Task::new(request.task_type(), request.into_params());
        self.status.put(&task).await?;

        if let Err(e) = self.queue.try_enqueue(task.clone()) {
            warn!(task_id = %task.id, "Rejected narrative task: {}", e);
            let reason = if e.is_full() {
                "narrative queue is full".to_string()
            } else {
                format!("failed to queue task: {}", e)
            };
            task.fail(reason)?;
            self.persist(&task).await;
            return Err(e.into());
        }

        debug!(task_id = %task.id, task_type = %task.task_type, "Queued narrative task");
        Ok(task)
    }

    /// Current record of a task, if it has not expired.
    pub async fn task_status(&self, id: &TaskId) -> WorkerResult<Option<Task>> {
        Ok(self.status.get(id).await?)
    }

    /// Route a dequeued task by type.
    pub async fn dispatch(&self, task: Task) -> WorkerResult<()> {
        match task.task_type {
            TaskType::AiVideo => self.run(task).await,
            TaskType::AiText => self.generate_novel(task).await,
            TaskType::Render => {
                let mut task = task;
                let message = format!("unsupported task type: {}", task.task_type);
                task.fail(&message)?;
                self.persist(&task).await;
                Err(WorkerError::processing_failed(message))
            }
        }
    }

    /// Produce and publish a narrated video for an `ai-video` task.
    pub async fn run(&self, mut task: Task) -> WorkerResult<()> {
        let logger = JobLogger::new(&task.id, "ai-video");
        logger.log_start("narrative video");
        let started = Instant::now();

        task.start()?;
        self.persist(&task).await;

        let artifacts = match self.produce(&mut task, &logger).await {
            Ok(artifacts) => artifacts,
            Err(e) => {
                counter!("vidcraft_narratives_total", "outcome" => "failed").increment(1);
                return self.fail_task(task, &logger, e).await;
            }
        };

        match self.publish(&task.id, &artifacts).await {
            Ok(result) => {
                task.complete(result)?;
                self.persist(&task).await;
                counter!("vidcraft_narratives_total", "outcome" => "completed").increment(1);
                histogram!("vidcraft_narrative_duration_seconds").record(started.elapsed().as_secs_f64());
                logger.log_completion(&format!("{} panels published", artifacts.panels.len()));
                Ok(())
            }
            Err(e) => {
                // The record stays at processing; nothing retries the upload.
                counter!("vidcraft_narratives_total", "outcome" => "unpublished").increment(1);
                logger.log_error(&format!("publish failed, task left in processing: {}", e));
                Err(e)
            }
        }
    }

    /// Generate novel text for an `ai-text` task.
    pub async fn generate_novel(&self, mut task: Task) -> WorkerResult<()> {
        let logger = JobLogger::new(&task.id, "ai-text");
        logger.log_start("novel text");

        task.start()?;
        self.persist(&task).await;

        let outcome = async {
            let params = NovelParams::from_task(&task)?;
            let prompt = novel_prompt(&params.novel, params.title());
            let text = self
                .backends
                .text
                .generate(&prompt)
                .await
                .map_err(|e| WorkerError::processing_failed(format!("novel generation failed: {}", e)))?;
            Ok::<_, WorkerError>((params.title().unwrap_or_default().to_string(), text))
        }
        .await;

        match outcome {
            Ok((title, text)) => {
                task.advance(50)?;
                self.persist(&task).await;
                logger.log_progress(50, "text generated");

                let length = text.chars().count();
                task.complete(json!({ "title": title, "text": text }))?;
                self.persist(&task).await;
                logger.log_completion(&format!("{} characters", length));
                Ok(())
            }
            Err(e) => self.fail_task(task, &logger, e).await,
        }
    }

    async fn produce(&self, task: &mut Task, logger: &JobLogger) -> WorkerResult<NarrativeArtifacts> {
        let params = NovelParams::from_task(task)?;

        let reply = self.write_script(&params.novel).await?;
        self.checkpoint(task, SCRIPT_DONE, logger, "script written").await;

        let panels = parse_panels(&reply);
        if panels.is_empty() {
            return Err(WorkerError::processing_failed("no panels could be parsed from the script"));
        }
        logger.log_progress(SCRIPT_DONE, &format!("{} panels", panels.len()));

        tokio::fs::create_dir_all(&self.settings.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("narrative-{}-", task.id))
            .tempdir_in(&self.settings.work_dir)?;

        let total = panels.len();
        let mut images = Vec::with_capacity(total);
        for (index, panel) in panels.iter().enumerate() {
            let number = index + 1;
            let image = self
                .backends
                .image
                .text_to_image(panel)
                .await
                .map_err(|e| {
                    WorkerError::processing_failed(format!("image generation failed for panel {}: {}", number, e))
                })?;

            let path = scratch.path().join(format!("panel_{}.{}", number, image.extension()));
            tokio::fs::write(&path, &image.data).await?;
            images.push(PanelImage {
                path,
                extension: image.extension(),
                content_type: image.content_type(),
            });

            let progress = SCRIPT_DONE + ((IMAGES_DONE - SCRIPT_DONE) as usize * number / total) as u8;
            self.checkpoint(task, progress, logger, &format!("panel {}/{} drawn", number, total))
                .await;
        }

        let narration = narration_text(&panels);
        let audio = self
            .backends
            .speech
            .synthesize(&narration)
            .await
            .map_err(|e| WorkerError::processing_failed(format!("speech synthesis failed: {}", e)))?;
        let audio_path = scratch.path().join(format!("narration.{}", audio.extension()));
        tokio::fs::write(&audio_path, &audio.data).await?;
        self.checkpoint(task, SPEECH_DONE, logger, "narration synthesized").await;

        let slideshow = SlideshowComposition::new(
            images.iter().map(|i| i.path.clone()).collect(),
            &audio_path,
        )
        .with_seconds_per_image(self.settings.seconds_per_image);
        let video = scratch.path().join("video.mp4");
        self.compositor
            .compose_slideshow(&slideshow, scratch.path(), &video)
            .await
            .map_err(|e| WorkerError::processing_failed(format!("video composition failed: {}", e)))?;
        self.checkpoint(task, VIDEO_DONE, logger, "video composed").await;

        Ok(NarrativeArtifacts {
            _scratch: scratch,
            panels,
            images,
            video,
        })
    }

    /// Ask the text backend for a shot list until the reply holds a JSON array.
    async fn write_script(&self, novel: &str) -> WorkerResult<String> {
        let prompt = script_prompt(novel);
        let text = &self.backends.text;

        let outcome = retry_async(&self.settings.script_retry, |attempt| {
            let prompt = prompt.as_str();
            async move {
                debug!(attempt, "Requesting script");
                let reply = text.generate(prompt).await.map_err(|e| e.to_string())?;
                match locate_json_array(&reply) {
                    Some(_) => Ok(reply),
                    None => Err("reply does not contain a JSON array".to_string()),
                }
            }
        })
        .await;

        outcome.into_result().map_err(|(error, attempts)| {
            WorkerError::processing_failed(format!(
                "script generation failed after {} attempts: {}",
                attempts, error
            ))
        })
    }

    /// Upload panel images and the video under `narratives/<task_id>/`.
    async fn publish(&self, task_id: &TaskId, artifacts: &NarrativeArtifacts) -> WorkerResult<Value> {
        let prefix = format!("narratives/{}", task_id);

        let mut image_urls = Vec::with_capacity(artifacts.images.len());
        for (index, image) in artifacts.images.iter().enumerate() {
            let key = format!("{}/panel_{}.{}", prefix, index + 1, image.extension);
            self.store
                .upload_file(&image.path, &key, image.content_type)
                .await?;
            image_urls.push(self.store.object_url(&key).await?);
        }

        let video_key = format!("{}/video.mp4", prefix);
        self.store
            .upload_file(&artifacts.video, &video_key, "video/mp4")
            .await?;
        let url = self.store.object_url(&video_key).await?;

        Ok(json!({
            "url": url,
            "images": image_urls,
            "panels": artifacts.panels,
        }))
    }

    async fn checkpoint(&self, task: &mut Task, progress: u8, logger: &JobLogger, message: &str) {
        match task.advance(progress) {
            Ok(()) => {
                self.persist(task).await;
                logger.log_progress(progress, message);
            }
            Err(e) => logger.log_warning(&e.to_string()),
        }
    }

    async fn fail_task(&self, mut task: Task, logger: &JobLogger, error: WorkerError) -> WorkerResult<()> {
        let message = error.to_string();
        logger.log_error(&message);
        if !task.is_terminal() {
            task.fail(&message)?;
            self.persist(&task).await;
        }
        Err(error)
    }

    /// Status writes are best effort once a task is running.
    async fn persist(&self, task: &Task) {
        if let Err(e) = self.status.put(task).await {
            warn!(task_id = %task.id, status = %task.status, "Failed to write task status: {}", e);
        }
    }
}

#[async_trait]
impl TaskHandler<Task> for NarrativePipeline {
    type Error = WorkerError;

    async fn handle(&self, task: Task) -> Result<(), WorkerError> {
        self.dispatch(task).await
    }
}

fn script_prompt(novel: &str) -> String {
    format!(
        "Split the following story into a storyboard for an illustrated video. \
         Reply with a JSON array of strings and nothing else. Each string is one \
         shot: a single-line visual description suitable as an image prompt.\n\n\
         Story:\n{}",
        novel.trim()
    )
}

fn novel_prompt(premise: &str, title: Option<&str>) -> String {
    match title {
        Some(title) => format!(
            "Write a complete short novel titled \"{}\" based on this premise:\n{}",
            title,
            premise.trim()
        ),
        None => format!(
            "Write a complete short novel based on this premise:\n{}",
            premise.trim()
        ),
    }
}

/// The outermost `[...]` span of `reply`, if it parses as a JSON array.
pub(crate) fn locate_json_array(reply: &str) -> Option<Vec<Value>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

/// Panel texts from a script reply.
///
/// A JSON array of strings is used as-is; anything else falls back to one
/// panel per non-empty line with list and JSON punctuation stripped.
pub fn parse_panels(reply: &str) -> Vec<String> {
    if let Some(items) = locate_json_array(reply) {
        if items.iter().all(Value::is_string) {
            return items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    reply
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn clean_line(line: &str) -> &str {
    let line = line
        .trim()
        .trim_matches(|c: char| matches!(c, '[' | ']' | '{' | '}' | ','))
        .trim();
    let line = line
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '•'))
        .trim_start();
    strip_enumeration(line)
        .trim_matches(|c: char| matches!(c, '"' | '\'' | ',' | '`'))
        .trim()
}

/// Drop a leading `12.` or `12)` marker.
fn strip_enumeration(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == line.len() {
        return line;
    }
    rest.strip_prefix('.')
        .or_else(|| rest.strip_prefix(')'))
        .map(str::trim_start)
        .unwrap_or(line)
}

/// Panel texts joined into one narration, each ending in a full stop.
pub fn narration_text(panels: &[String]) -> String {
    panels
        .iter()
        .map(|panel| panel.trim())
        .filter(|panel| !panel.is_empty())
        .map(|panel| {
            if panel.ends_with(&['.', '!', '?', '。', '！', '？'][..]) {
                panel.to_string()
            } else {
                format!("{}.", panel)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
