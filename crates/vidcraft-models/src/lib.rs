//! Shared data models for the VidCraft task core.
//!
//! This crate provides Serde-serializable types for:
//! - Generic asynchronous tasks and their status lifecycle
//! - Render jobs (timeline-to-video compositing)
//! - Project timelines (tracks, clips, effects)
//! - Catalog entities consumed by the render engine

pub mod catalog;
pub mod error;
pub mod render;
pub mod task;
pub mod timeline;

// Re-export common types
pub use catalog::{Material, Project};
pub use error::{ModelError, ModelResult};
pub use render::{Render, RenderFormat, RenderId, RenderQuality};
pub use task::{Task, TaskId, TaskStatus, TaskType};
pub use timeline::{Clip, ClipEffect, EffectSpec, ProjectTimeline, Track, TrackKind};
