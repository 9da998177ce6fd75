//! Artifact store seam.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Lifetime of presigned download links handed to users.
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Object storage for materials and produced artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()>;

    async fn upload_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StorageResult<()>;

    /// Download an object into `path`, creating parent directories.
    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()>;

    /// Temporary signed GET URL.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Long-lived URL for a published object.
    async fn object_url(&self, key: &str) -> StorageResult<String>;

    async fn delete_object(&self, key: &str) -> StorageResult<()>;
}
