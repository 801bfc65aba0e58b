//! The metadata store seam.

use async_trait::async_trait;
use hush_models::{UploadRecord, UserId};

use crate::error::MetadataResult;

/// Record store keyed by user, holding pointers to stored blobs.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert one record pointing at `file_url`.
    async fn insert_video(&self, user_id: &UserId, file_url: &str) -> MetadataResult<UploadRecord>;

    /// All records owned by `user_id`.
    async fn list_videos(&self, user_id: &UserId) -> MetadataResult<Vec<UploadRecord>>;

    /// Verify the backend is reachable.
    async fn check_connectivity(&self) -> MetadataResult<()>;
}
