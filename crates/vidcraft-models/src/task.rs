//! Generic asynchronous task records.
//!
//! A [`Task`] is created pending by the submitter, then mutated only by the
//! worker executing it. Progress never moves backwards and a terminal task
//! (completed or failed) refuses further changes.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Unique identifier for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new random task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of work a task carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    /// Timeline compositing
    Render,
    /// Free-text generation (novel writing)
    AiText,
    /// Narrative text to narrated video
    AiVideo,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Render => "render",
            TaskType::AiText => "ai-text",
            TaskType::AiVideo => "ai-video",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task processing status, shared by tasks and renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in a queue
    #[default]
    Pending,
    /// Being executed by a worker
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl TaskStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Parse a status filter value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Clamp a progress update so it never exceeds 100 or moves backwards.
pub(crate) fn monotonic_progress(current: u8, next: u8) -> u8 {
    current.max(next.min(100))
}

/// A unit of asynchronous work.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Opaque submission parameters
    #[serde(default)]
    pub params: serde_json::Value,
    /// Opaque result, present only when completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error text, present only when failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task.
    pub fn new(task_type: TaskType, params: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            task_type,
            status: TaskStatus::Pending,
            progress: 0,
            params,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_mutable(&self) -> ModelResult<()> {
        if self.is_terminal() {
            return Err(ModelError::terminal("task", self.id.as_str(), self.status.as_str()));
        }
        Ok(())
    }

    /// Move to processing.
    pub fn start(&mut self) -> ModelResult<()> {
        self.ensure_mutable()?;
        self.status = TaskStatus::Processing;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record progress. Lower values than the current one are ignored.
    pub fn advance(&mut self, progress: u8) -> ModelResult<()> {
        self.ensure_mutable()?;
        self.progress = monotonic_progress(self.progress, progress);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark the task completed with its result.
    pub fn complete(&mut self, result: serde_json::Value) -> ModelResult<()> {
        self.ensure_mutable()?;
        self.status = TaskStatus::Completed;
        self.progress = 100;
        self.result = Some(result);
        self.error = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark the task failed. Progress keeps its last value.
    pub fn fail(&mut self, error: impl Into<String>) -> ModelResult<()> {
        self.ensure_mutable()?;
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.result = None;
        self.updated_at = Utc::now();
        Ok(())
    }
}
