//! Artifact storage.
//!
//! This crate provides:
//! - The [`ArtifactStore`] seam used by workers and the API
//! - An S3-compatible client (upload, download, presign, delete)
//! - An in-memory store for local runs and tests

pub mod client;
pub mod error;
pub mod memory;
pub mod store;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryArtifactStore;
pub use store::{ArtifactStore, DOWNLOAD_URL_TTL};
