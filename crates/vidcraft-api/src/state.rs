//! Application state.

use std::sync::Arc;

use vidcraft_worker::{NarrativePipeline, RenderService, Workers};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub render: Arc<RenderService>,
    pub narrative: Arc<NarrativePipeline>,
}

impl AppState {
    pub fn new(config: ApiConfig, render: Arc<RenderService>, narrative: Arc<NarrativePipeline>) -> Self {
        Self {
            config,
            render,
            narrative,
        }
    }

    /// State backed by running worker pools.
    pub fn from_workers(config: ApiConfig, workers: &Workers) -> Self {
        Self::new(
            config,
            Arc::clone(&workers.render),
            Arc::clone(&workers.narrative),
        )
    }
}
