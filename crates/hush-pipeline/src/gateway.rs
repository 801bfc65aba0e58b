//! Upload gateway: blob storage first, metadata second.

use std::sync::Arc;

use bytes::Bytes;
use hush_metadata::MetadataStore;
use hush_models::{UploadRecord, UserId};
use hush_storage::BlobStore;
use tracing::{info, warn};

use crate::error::PipelineResult;

/// Wraps the object store and the metadata store behind one surface.
///
/// The orchestrator only calls `write_metadata` after `store_blob` succeeded,
/// so a record never points at a missing blob.
#[derive(Clone)]
pub struct UploadGateway {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
}

impl UploadGateway {
    pub fn new(blobs: Arc<dyn BlobStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { blobs, metadata }
    }

    /// Store `data` at `key` and return its public URL.
    ///
    /// If the URL cannot be derived the stored object is removed again.
    pub async fn store_blob(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> PipelineResult<String> {
        self.blobs.put_object(key, data, content_type).await?;

        match self.blobs.public_url(key) {
            Ok(url) => {
                info!(key = %key, "Stored blob at {}", url);
                Ok(url)
            }
            Err(e) => {
                self.discard_blob(key).await;
                Err(e.into())
            }
        }
    }

    /// Write the record for a stored blob.
    pub async fn write_metadata(
        &self,
        user_id: &UserId,
        file_url: &str,
    ) -> PipelineResult<UploadRecord> {
        Ok(self.metadata.insert_video(user_id, file_url).await?)
    }

    /// Best-effort removal of a blob whose run failed later. Never fails.
    pub async fn discard_blob(&self, key: &str) -> bool {
        match self.blobs.delete_object(key).await {
            Ok(()) => {
                info!(key = %key, "Discarded blob of failed run");
                true
            }
            Err(e) => {
                warn!(key = %key, "Failed to discard blob, leaving orphan: {}", e);
                crate::metrics::record_orphaned_blob();
                false
            }
        }
    }

    /// Records owned by `user_id`, with stored keys turned into public URLs.
    pub async fn list_videos(&self, user_id: &UserId) -> PipelineResult<Vec<UploadRecord>> {
        let records = self.metadata.list_videos(user_id).await?;

        Ok(records
            .into_iter()
            .map(|mut record| {
                if !is_absolute_url(&record.file_url) {
                    let key = record.file_url.trim_start_matches('/');
                    if let Ok(url) = self.blobs.public_url(key) {
                        record.file_url = url;
                    }
                }
                record
            })
            .collect())
    }

    pub async fn check_storage(&self) -> PipelineResult<()> {
        Ok(self.blobs.check_connectivity().await?)
    }

    pub async fn check_metadata(&self) -> PipelineResult<()> {
        Ok(self.metadata.check_connectivity().await?)
    }
}

fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
