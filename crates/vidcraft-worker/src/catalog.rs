//! Catalog repositories: projects, materials and render records.
//!
//! The relational store behind these lives outside this crate; the
//! in-memory [`MemoryCatalog`] backs tests and local runs and can be
//! seeded from a JSON file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use vidcraft_models::{Material, Project, Render, RenderId, TaskStatus};

use crate::error::{WorkerError, WorkerResult};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn get_project(&self, project_id: &str) -> WorkerResult<Option<Project>>;
}

#[async_trait]
pub trait MaterialRepository: Send + Sync {
    async fn get_material(&self, material_id: &str) -> WorkerResult<Option<Material>>;
}

/// Render records. Only the owning worker updates a record once created.
#[async_trait]
pub trait RenderRepository: Send + Sync {
    async fn create_render(&self, render: &Render) -> WorkerResult<()>;

    async fn get_render(&self, render_id: &RenderId) -> WorkerResult<Option<Render>>;

    /// Replace the stored record.
    async fn update_render(&self, render: &Render) -> WorkerResult<()>;

    /// Returns whether a record was removed.
    async fn delete_render(&self, render_id: &RenderId) -> WorkerResult<bool>;

    async fn list_renders(&self, user_id: &str, filter: &RenderFilter) -> WorkerResult<RenderPage>;
}

/// Listing filter for a user's renders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderFilter {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl RenderFilter {
    /// 1-based page, defaulting to the first.
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }

    fn matches(&self, render: &Render) -> bool {
        self.project_id
            .as_deref()
            .map_or(true, |p| render.project_id == p)
            && self.status.map_or(true, |s| render.status == s)
    }
}

/// One page of renders, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct RenderPage {
    pub renders: Vec<Render>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

/// Seed file layout for [`MemoryCatalog::from_seed_file`].
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub materials: Vec<Material>,
}

/// In-process catalog implementing every repository.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    projects: RwLock<HashMap<String, Project>>,
    materials: RwLock<HashMap<String, Material>>,
    renders: RwLock<HashMap<RenderId, Render>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        Self {
            projects: RwLock::new(seed.projects.into_iter().map(|p| (p.id.clone(), p)).collect()),
            materials: RwLock::new(seed.materials.into_iter().map(|m| (m.id.clone(), m)).collect()),
            renders: RwLock::default(),
        }
    }

    /// Load projects and materials from a JSON seed file.
    pub async fn from_seed_file(path: impl AsRef<Path>) -> WorkerResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            WorkerError::config_error(format!("failed to read catalog seed {}: {}", path.display(), e))
        })?;
        let seed: CatalogSeed = serde_json::from_str(&raw)?;
        info!(
            projects = seed.projects.len(),
            materials = seed.materials.len(),
            "Loaded catalog seed from {}",
            path.display()
        );
        Ok(Self::from_seed(seed))
    }

    pub async fn insert_project(&self, project: Project) {
        self.projects.write().await.insert(project.id.clone(), project);
    }

    pub async fn insert_material(&self, material: Material) {
        self.materials.write().await.insert(material.id.clone(), material);
    }
}

#[async_trait]
impl ProjectRepository for MemoryCatalog {
    async fn get_project(&self, project_id: &str) -> WorkerResult<Option<Project>> {
        Ok(self.projects.read().await.get(project_id).cloned())
    }
}

#[async_trait]
impl MaterialRepository for MemoryCatalog {
    async fn get_material(&self, material_id: &str) -> WorkerResult<Option<Material>> {
        Ok(self.materials.read().await.get(material_id).cloned())
    }
}

#[async_trait]
impl RenderRepository for MemoryCatalog {
    async fn create_render(&self, render: &Render) -> WorkerResult<()> {
        self.renders
            .write()
            .await
            .insert(render.id.clone(), render.clone());
        Ok(())
    }

    async fn get_render(&self, render_id: &RenderId) -> WorkerResult<Option<Render>> {
        Ok(self.renders.read().await.get(render_id).cloned())
    }

    async fn update_render(&self, render: &Render) -> WorkerResult<()> {
        let mut renders = self.renders.write().await;
        match renders.get_mut(&render.id) {
            Some(stored) => {
                *stored = render.clone();
                Ok(())
            }
            None => Err(WorkerError::not_found("render", render.id.as_str())),
        }
    }

    async fn delete_render(&self, render_id: &RenderId) -> WorkerResult<bool> {
        Ok(self.renders.write().await.remove(render_id).is_some())
    }

    async fn list_renders(&self, user_id: &str, filter: &RenderFilter) -> WorkerResult<RenderPage> {
        let page = filter.page();
        let page_size = filter.page_size();

        let mut matching: Vec<Render> = self
            .renders
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id && filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len();
        let offset = ((page - 1) as usize).saturating_mul(page_size as usize);
        let renders = matching
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();

        Ok(RenderPage {
            renders,
            total,
            page,
            page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn render_at(user: &str, project: &str, minutes_ago: i64) -> Render {
        let mut render = Render::new(user, project, "cut");
        render.created_at = Utc::now() - Duration::minutes(minutes_ago);
        render
    }

    #[test]
    fn test_filter_defaults_and_cap() {
        let filter = RenderFilter::default();
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.page_size(), 20);

        let filter = RenderFilter {
            page: Some(0),
            page_size: Some(500),
            ..Default::default()
        };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.page_size(), 100);
    }

    #[tokio::test]
    async fn test_list_is_scoped_filtered_and_paged() {
        let catalog = MemoryCatalog::new();
        for i in 0..5 {
            catalog.create_render(&render_at("u1", "p1", i)).await.unwrap();
        }
        catalog.create_render(&render_at("u1", "p2", 10)).await.unwrap();
        catalog.create_render(&render_at("u2", "p1", 0)).await.unwrap();

        let all = catalog.list_renders("u1", &RenderFilter::default()).await.unwrap();
        assert_eq!(all.total, 6);
        assert!(all
            .renders
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));

        let filter = RenderFilter {
            page: Some(2),
            page_size: Some(2),
            project_id: Some("p1".into()),
            status: None,
        };
        let page = catalog.list_renders("u1", &filter).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.renders.len(), 2);
        assert!(page.renders.iter().all(|r| r.project_id == "p1"));
    }

    #[tokio::test]
    async fn test_status_filter() {
        let catalog = MemoryCatalog::new();
        let mut failed = Render::new("u1", "p1", "bad");
        failed.fail("boom").unwrap();
        catalog.create_render(&failed).await.unwrap();
        catalog.create_render(&Render::new("u1", "p1", "ok")).await.unwrap();

        let filter = RenderFilter {
            status: Some(TaskStatus::Failed),
            ..Default::default()
        };
        let page = catalog.list_renders("u1", &filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.renders[0].name, "bad");
    }

    #[tokio::test]
    async fn test_update_unknown_render() {
        let catalog = MemoryCatalog::new();
        let err = catalog
            .update_render(&Render::new("u1", "p1", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(
            &path,
            r#"{
                "projects": [{"id": "p1", "user_id": "u1", "name": "Trip", "config": {"tracks": []}}],
                "materials": [{"id": "m1", "name": "Intro", "file_name": "intro.mp4", "file_path": "materials/m1.mp4"}]
            }"#,
        )
        .unwrap();

        let catalog = MemoryCatalog::from_seed_file(&path).await.unwrap();
        assert_eq!(catalog.get_project("p1").await.unwrap().unwrap().user_id, "u1");
        assert!(catalog.get_material("m1").await.unwrap().is_some());
        assert!(catalog.get_material("m2").await.unwrap().is_none());
    }
}
