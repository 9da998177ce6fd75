//! Render jobs: one timeline composited into one output video.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::task::{monotonic_progress, TaskStatus};

/// Unique identifier for a render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RenderId(pub String);

impl RenderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RenderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    #[default]
    Mp4,
    Avi,
    Mov,
    Mkv,
}

impl RenderFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            RenderFormat::Mp4 => "mp4",
            RenderFormat::Avi => "avi",
            RenderFormat::Mov => "mov",
            RenderFormat::Mkv => "mkv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            RenderFormat::Mp4 => "video/mp4",
            RenderFormat::Avi => "video/x-msvideo",
            RenderFormat::Mov => "video/quicktime",
            RenderFormat::Mkv => "video/x-matroska",
        }
    }

    /// Parse a request value. Empty input selects the default container.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "mp4" => Some(RenderFormat::Mp4),
            "avi" => Some(RenderFormat::Avi),
            "mov" => Some(RenderFormat::Mov),
            "mkv" => Some(RenderFormat::Mkv),
            _ => None,
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Requested quality tier. Recorded on the render; the encode profile is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    High,
    #[default]
    Medium,
    Low,
}

impl RenderQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderQuality::High => "high",
            RenderQuality::Medium => "medium",
            RenderQuality::Low => "low",
        }
    }
}

/// A render job record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Render {
    pub id: RenderId,
    pub user_id: String,
    pub project_id: String,
    pub name: String,
    pub status: TaskStatus,
    pub progress: u8,
    /// Object key of the uploaded output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default)]
    pub output_size: u64,
    /// Output duration in seconds (0 when unknown)
    #[serde(default)]
    pub duration: f64,
    /// Output size as `WxH`, passed through to the encoder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default)]
    pub format: RenderFormat,
    #[serde(default)]
    pub quality: RenderQuality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Render {
    /// Create a pending render for a project.
    pub fn new(
        user_id: impl Into<String>,
        project_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RenderId::new(),
            user_id: user_id.into(),
            project_id: project_id.into(),
            name: name.into(),
            status: TaskStatus::Pending,
            progress: 0,
            output_path: None,
            output_size: 0,
            duration: 0.0,
            resolution: None,
            format: RenderFormat::default(),
            quality: RenderQuality::default(),
            error: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_format(mut self, format: RenderFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_quality(mut self, quality: RenderQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_resolution(mut self, resolution: Option<String>) -> Self {
        self.resolution = resolution.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Object key the output is uploaded under.
    pub fn output_key(&self) -> String {
        format!("{}/{}.{}", self.user_id, self.id, self.format.extension())
    }

    fn ensure_mutable(&self) -> ModelResult<()> {
        if self.is_terminal() {
            return Err(ModelError::terminal("render", self.id.as_str(), self.status.as_str()));
        }
        Ok(())
    }

    /// Move to processing and stamp `started_at`.
    pub fn start(&mut self) -> ModelResult<()> {
        self.ensure_mutable()?;
        let now = Utc::now();
        self.status = TaskStatus::Processing;
        self.started_at.get_or_insert(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn advance(&mut self, progress: u8) -> ModelResult<()> {
        self.ensure_mutable()?;
        self.progress = monotonic_progress(self.progress, progress);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the published output and mark completed.
    pub fn complete(&mut self, output_path: String, output_size: u64, duration: f64) -> ModelResult<()> {
        self.ensure_mutable()?;
        let now = Utc::now();
        self.output_path = Some(output_path);
        self.output_size = output_size;
        self.duration = duration;
        self.status = TaskStatus::Completed;
        self.progress = 100;
        self.error = None;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> ModelResult<()> {
        self.ensure_mutable()?;
        let now = Utc::now();
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
