//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hush_models::Stage;
use hush_pipeline::{FailureClass, PipelineError};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Pipeline(e) => match e.outcome() {
                FailureClass::BadInput => StatusCode::BAD_REQUEST,
                FailureClass::ProcessingFailed | FailureClass::StorageFailed => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Machine-readable outcome code.
    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Pipeline(e) => Some(match e.outcome() {
                FailureClass::BadInput => "bad_input",
                FailureClass::ProcessingFailed => "processing_failed",
                FailureClass::StorageFailed => "storage_failed",
            }),
            _ => None,
        }
    }

    fn stage(&self) -> Option<Stage> {
        match self {
            ApiError::Pipeline(e) => Some(e.stage()),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status.is_server_error()
            && std::env::var("ENVIRONMENT")
                .unwrap_or_default()
                .eq_ignore_ascii_case("production")
        {
            match self.code() {
                Some("storage_failed") => "Video upload failed".to_string(),
                Some(_) => "Video processing failed".to_string(),
                None => "An internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
            stage: self.stage(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hush_media::MediaError;
    use hush_storage::StorageError;

    #[test]
    fn test_pipeline_outcomes_map_to_status() {
        let bad_input: ApiError = PipelineError::validation("empty").into();
        assert_eq!(bad_input.status_code(), StatusCode::BAD_REQUEST);

        let processing: ApiError = PipelineError::media(
            Stage::Extracting,
            MediaError::process_failed(Stage::Extracting, Some(1), ""),
        )
        .into();
        assert_eq!(processing.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(processing.code(), Some("processing_failed"));
        assert_eq!(processing.stage(), Some(Stage::Extracting));

        let storage: ApiError = PipelineError::from(StorageError::upload_failed("503")).into();
        assert_eq!(storage.code(), Some("storage_failed"));
    }

    #[test]
    fn test_auth_is_401() {
        assert_eq!(
            ApiError::unauthorized("missing token").status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
