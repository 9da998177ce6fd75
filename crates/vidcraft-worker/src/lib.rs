//! VidCraft workers.
//!
//! This crate provides:
//! - The render engine: project timeline to one composited video
//! - The narrative pipeline: story text to a narrated slideshow video
//! - Novel text generation tasks
//! - Catalog repositories with an in-memory implementation
//! - Worker pool wiring, job logging and retry helpers

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod narrative;
pub mod pools;
pub mod render;
pub mod retry;

pub use catalog::{
    CatalogSeed, MaterialRepository, MemoryCatalog, ProjectRepository, RenderFilter, RenderPage,
    RenderRepository,
};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use narrative::{
    narration_text, parse_panels, NarrativeBackends, NarrativePipeline, NarrativeRequest,
    NarrativeSettings,
};
pub use pools::{WorkerDeps, Workers};
pub use render::{CreateRenderRequest, RenderCatalog, RenderProgress, RenderService};
pub use retry::{retry_async, RetryConfig, RetryResult};
