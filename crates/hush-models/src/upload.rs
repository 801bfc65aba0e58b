//! Upload record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the user owning an upload, as issued by the authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Persisted pointer to a processed video. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UploadRecord {
    /// Record id assigned by the metadata store, when it returns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owning user
    pub user_id: UserId,
    /// Public retrieval URL of the stored blob
    pub file_url: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl UploadRecord {
    pub fn new(user_id: UserId, file_url: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id,
            file_url: file_url.into(),
            created_at: Utc::now(),
        }
    }
}
