//! Catalog entities owned by the relational store and read by the render engine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::timeline::ProjectTimeline;

/// An editing project. `config` holds the timeline JSON as stored.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl Project {
    /// Parse the stored config into a validated timeline.
    pub fn timeline(&self) -> ModelResult<ProjectTimeline> {
        if self.config.is_null() {
            return Ok(ProjectTimeline::default());
        }
        ProjectTimeline::from_value(&self.config)
    }
}

/// An uploaded media asset.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Material {
    pub id: String,
    pub name: String,
    /// Original upload file name
    pub file_name: String,
    /// Object key in the artifact store
    pub file_path: String,
}

impl Material {
    /// Lowercased extension of the original file name, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}
