//! Video upload handler.

use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use hush_models::{RunId, UploadRecord};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the video.
pub const VIDEO_FIELD: &str = "video";

const NO_VIDEO: &str = "No video file uploaded";

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub run_id: RunId,
    pub file_url: String,
    pub record: UploadRecord,
}

/// Run an uploaded video through the enhancement pipeline.
///
/// Authentication is resolved before the body is read, so a rejected caller
/// never starts a run.
pub async fn upload_video(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let (file_name, video) = read_video_field(&mut multipart).await?;
    let size = video.len();

    info!(
        user_id = %user.user_id,
        file_name = %file_name,
        size_bytes = size,
        "Video upload received"
    );

    match state
        .orchestrator
        .run(&user.user_id, &file_name, video)
        .await
    {
        Ok(outcome) => {
            metrics::record_upload("done", size);
            Ok(Json(UploadResponse {
                message: "Video processed and uploaded successfully".to_string(),
                file_url: outcome.public_url().to_string(),
                run_id: outcome.run_id,
                record: outcome.record,
            }))
        }
        Err(e) => {
            metrics::record_upload("failed", size);
            warn!(user_id = %user.user_id, stage = %e.stage(), "Upload failed: {}", e);
            Err(e.into())
        }
    }
}

/// The filename and content of the `video` field. Other fields are skipped.
async fn read_video_field(multipart: &mut Multipart) -> ApiResult<(String, Bytes)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request(NO_VIDEO))?;

        let video = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        return Ok((file_name, video));
    }

    Err(ApiError::bad_request(NO_VIDEO))
}
