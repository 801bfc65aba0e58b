//! The blob store seam and key/URL helpers.

use async_trait::async_trait;
use bytes::Bytes;
use hush_models::UserId;
use url::Url;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Durable blob storage keyed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`.
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Delete the object at `key`. Deleting a missing key succeeds.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Publicly resolvable URL for `key`.
    fn public_url(&self, key: &str) -> StorageResult<String>;

    /// Verify the backend is reachable.
    async fn check_connectivity(&self) -> StorageResult<()>;
}

/// Fresh object key for a processed video: `{user_id}/{uuid}.mp4`.
pub fn blob_key(user_id: &UserId) -> String {
    format!("{}/{}.mp4", user_id, Uuid::new_v4())
}

/// Join `key` onto `base`, treating `base` as a directory.
pub fn public_url_for(base: &str, key: &str) -> StorageResult<String> {
    if key.is_empty() || key.starts_with('/') {
        return Err(StorageError::public_url(key, "key must be a relative path"));
    }

    let mut base = Url::parse(base).map_err(|e| StorageError::public_url(key, e))?;
    if base.cannot_be_a_base() {
        return Err(StorageError::public_url(key, "base URL cannot hold a path"));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(key)
        .map(String::from)
        .map_err(|e| StorageError::public_url(key, e))
}
