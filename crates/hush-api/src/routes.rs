//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{health, index, list_videos, ready, upload_video};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    // A run takes as long as its stages take; the pipeline enforces its own
    // per-stage timeouts. The body is bounded by the outer limit layer.
    let upload_routes = Router::new()
        .route("/upload", post(upload_video))
        .layer(DefaultBodyLimit::disable());

    let api_routes = Router::new()
        .route("/api/videos", get(list_videos))
        .layer(TimeoutLayer::new(state.config.request_timeout));

    let limited_routes = upload_routes
        .merge(api_routes)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    let health_routes = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(limited_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use bytes::Bytes;
    use hush_media::{EnhancementInvoker, MediaError, MediaResult, Transcoder};
    use hush_metadata::{MetadataResult, MetadataStore};
    use hush_models::{Stage, StageResult, UploadRecord, UserId};
    use hush_pipeline::{Orchestrator, UploadGateway};
    use hush_storage::{public_url_for, BlobStore, StorageResult};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::auth::{AuthUser, Authenticator};
    use crate::config::ApiConfig;
    use crate::error::{ApiError, ApiResult};

    const GOOD_TOKEN: &str = "good-token";
    const BOUNDARY: &str = "hush-test-boundary";

    struct FakeAuth;

    #[async_trait]
    impl Authenticator for FakeAuth {
        async fn authenticate(&self, token: &str) -> ApiResult<AuthUser> {
            if token == GOOD_TOKEN {
                Ok(AuthUser {
                    user_id: UserId::from("user-1"),
                    email: None,
                })
            } else {
                Err(ApiError::unauthorized("bad token"))
            }
        }
    }

    struct FakeTranscoder {
        fail_extract: bool,
        calls: AtomicUsize,
    }

    fn ok(stage: Stage) -> StageResult {
        StageResult {
            stage,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
        }
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        async fn extract_audio(&self, _video: &Path, audio: &Path) -> MediaResult<StageResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_extract {
                return Err(MediaError::process_failed(
                    Stage::Extracting,
                    Some(1),
                    "Invalid data found when processing input",
                ));
            }
            std::fs::write(audio, b"PCM").unwrap();
            Ok(ok(Stage::Extracting))
        }

        async fn remux(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<StageResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut data = std::fs::read(video).unwrap();
            data.extend_from_slice(&std::fs::read(audio).unwrap());
            std::fs::write(output, data).unwrap();
            Ok(ok(Stage::Remuxing))
        }
    }

    struct FakeBlobs;

    #[async_trait]
    impl BlobStore for FakeBlobs {
        async fn put_object(&self, _key: &str, _data: Bytes, _content_type: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn delete_object(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }

        fn public_url(&self, key: &str) -> StorageResult<String> {
            public_url_for("https://cdn.example.com/videos", key)
        }

        async fn check_connectivity(&self) -> StorageResult<()> {
            Ok(())
        }
    }

    struct FakeRecords;

    #[async_trait]
    impl MetadataStore for FakeRecords {
        async fn insert_video(&self, user_id: &UserId, file_url: &str) -> MetadataResult<UploadRecord> {
            Ok(UploadRecord::new(user_id.clone(), file_url))
        }

        async fn list_videos(&self, user_id: &UserId) -> MetadataResult<Vec<UploadRecord>> {
            Ok(vec![UploadRecord::new(user_id.clone(), "user-1/a.mp4")])
        }

        async fn check_connectivity(&self) -> MetadataResult<()> {
            Ok(())
        }
    }

    struct TestApp {
        scratch: TempDir,
        transcoder: Arc<FakeTranscoder>,
        router: Router,
    }

    impl TestApp {
        fn transcoder_calls(&self) -> usize {
            self.transcoder.calls.load(Ordering::SeqCst)
        }

        fn scratch_is_empty(&self) -> bool {
            std::fs::read_dir(self.scratch.path()).unwrap().next().is_none()
        }
    }

    fn app_with(config: ApiConfig, fail_extract: bool) -> TestApp {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(FakeTranscoder {
            fail_extract,
            calls: AtomicUsize::new(0),
        });
        let enhancer = EnhancementInvoker::new("sh")
            .with_args(["-c", r#"printf 'ENHANCED' > "$1""#])
            .with_settle_delay(Duration::ZERO);
        let gateway = UploadGateway::new(Arc::new(FakeBlobs), Arc::new(FakeRecords));
        let orchestrator = Orchestrator::new(
            transcoder.clone(),
            Arc::new(enhancer),
            gateway,
            scratch.path(),
            2,
        );
        let state = AppState::new(config, orchestrator, Arc::new(FakeAuth));

        TestApp {
            scratch,
            transcoder,
            router: create_router(state, None),
        }
    }

    fn app(fail_extract: bool) -> TestApp {
        app_with(ApiConfig::default(), fail_extract)
    }

    fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: video/mp4\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(token: Option<&str>, body: Vec<u8>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_index() {
        let app = app(false);
        let response = app
            .router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Hello World");
    }

    #[tokio::test]
    async fn test_health_sets_security_and_request_id_headers() {
        let app = app(false);
        let response = app
            .router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-request-id"], "req-42");
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_both_backends() {
        let app = app(false);
        let response = app
            .router
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["checks"]["storage"]["status"], "ok");
        assert_eq!(body["checks"]["metadata"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_unauthenticated_upload_never_starts_pipeline() {
        let app = app(false);
        let response = app
            .router
            .clone()
            .oneshot(upload_request(None, multipart_body("video", "a.mp4", b"VIDEO")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(app.transcoder_calls(), 0);
        assert!(app.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_invalid_token_is_401() {
        let app = app(false);
        let response = app
            .router
            .clone()
            .oneshot(upload_request(
                Some("forged"),
                multipart_body("video", "a.mp4", b"VIDEO"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(app.transcoder_calls(), 0);
        assert!(app.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_upload_success_returns_public_url() {
        let app = app(false);
        let response = app
            .router
            .clone()
            .oneshot(upload_request(
                Some(GOOD_TOKEN),
                multipart_body("video", "a.mp4", b"VIDEO"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let file_url = body["file_url"].as_str().unwrap();
        assert!(file_url.starts_with("https://cdn.example.com/videos/user-1/"));
        assert!(file_url.ends_with(".mp4"));
        assert_eq!(body["record"]["user_id"], "user-1");
        assert_eq!(app.transcoder_calls(), 2);
        assert!(app.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_upload_without_video_field_is_400() {
        let app = app(false);
        let response = app
            .router
            .clone()
            .oneshot(upload_request(
                Some(GOOD_TOKEN),
                multipart_body("attachment", "a.mp4", b"VIDEO"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["detail"], "Bad request: No video file uploaded");
        assert_eq!(app.transcoder_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_is_400() {
        let app = app(false);
        let response = app
            .router
            .clone()
            .oneshot(upload_request(Some(GOOD_TOKEN), multipart_body("video", "a.mp4", b"")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "bad_input");
    }

    #[tokio::test]
    async fn test_extraction_failure_is_500_with_stage() {
        let app = app(true);
        let response = app
            .router
            .clone()
            .oneshot(upload_request(
                Some(GOOD_TOKEN),
                multipart_body("video", "a.mp4", b"VIDEO"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["code"], "processing_failed");
        assert_eq!(body["stage"], "extracting");
        assert_eq!(app.transcoder_calls(), 1);
        assert!(app.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_list_videos_normalizes_urls() {
        let app = app(false);
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/videos")
                    .header(header::AUTHORIZATION, format!("Bearer {GOOD_TOKEN}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body["videos"][0]["file_url"],
            "https://cdn.example.com/videos/user-1/a.mp4"
        );
    }

    #[tokio::test]
    async fn test_rate_limit_applies_per_ip() {
        let config = ApiConfig {
            rate_limit_rps: 1,
            ..ApiConfig::default()
        };
        let app = app_with(config, false);

        let request = || {
            Request::builder()
                .uri("/api/videos")
                .header(header::AUTHORIZATION, format!("Bearer {GOOD_TOKEN}"))
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.router.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.router.clone().oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()[header::RETRY_AFTER], "1");
    }
}
