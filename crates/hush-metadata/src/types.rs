//! Row shapes exchanged with the metadata table.

use chrono::{DateTime, Utc};
use hush_models::{UploadRecord, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of an insert: exactly the two columns the pipeline owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewVideoRow<'a> {
    pub file_url: &'a str,
    #[serde(rename = "userId")]
    pub user_id: &'a str,
}

/// A row as returned by the table.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoRow {
    /// Primary key; integer or uuid depending on the table definition
    #[serde(default)]
    pub id: Option<Value>,
    pub file_url: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl VideoRow {
    pub fn into_record(self) -> UploadRecord {
        let id = match self.id {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        UploadRecord {
            id,
            user_id: UserId::new(self.user_id),
            file_url: self.file_url,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}
