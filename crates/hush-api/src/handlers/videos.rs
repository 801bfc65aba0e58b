//! Video listing handler.

use axum::extract::State;
use axum::Json;
use hush_models::UploadRecord;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<UploadRecord>,
}

/// The caller's processed videos.
pub async fn list_videos(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<VideoListResponse>> {
    let videos = state
        .orchestrator
        .gateway()
        .list_videos(&user.user_id)
        .await?;

    Ok(Json(VideoListResponse { videos }))
}
