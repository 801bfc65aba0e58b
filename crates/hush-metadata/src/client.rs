//! PostgREST metadata client.
//!
//! Talks to a Supabase-style `rest/v1` endpoint with the service role key.
//! Every request is wrapped in a tracing span and recorded in metrics.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use hush_models::{UploadRecord, UserId};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use tracing::{debug, info_span, Instrument};

use crate::error::{MetadataError, MetadataResult};
use crate::metrics::record_request;
use crate::store::MetadataStore;
use crate::types::{NewVideoRow, VideoRow};

// =============================================================================
// Configuration
// =============================================================================

/// Metadata client configuration.
#[derive(Debug, Clone)]
pub struct RestMetadataConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    /// Service role key, sent as `apikey` and bearer token
    pub service_key: String,
    /// Table holding one row per processed video
    pub table: String,
    /// Request timeout
    pub timeout: Duration,
}

impl RestMetadataConfig {
    /// Create config from environment variables.
    pub fn from_env() -> MetadataResult<Self> {
        let base_url = std::env::var("SUPABASE_URL")
            .map_err(|_| MetadataError::config_error("SUPABASE_URL not set"))?;
        let service_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .map_err(|_| MetadataError::config_error("SUPABASE_SERVICE_ROLE_KEY not set"))?;

        if base_url.is_empty() || service_key.is_empty() {
            return Err(MetadataError::config_error(
                "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY cannot be empty",
            ));
        }

        let timeout_secs: u64 = std::env::var("METADATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            base_url,
            service_key,
            table: std::env::var("METADATA_TABLE").unwrap_or_else(|_| "Video".to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// Metadata store backed by a PostgREST table.
#[derive(Clone)]
pub struct RestMetadataStore {
    http: Client,
    table_url: String,
    table: String,
}

impl RestMetadataStore {
    /// Create a new client.
    pub fn new(config: RestMetadataConfig) -> MetadataResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.service_key)
            .map_err(|_| MetadataError::config_error("service key is not a valid header value"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.service_key))
            .map_err(|_| MetadataError::config_error("service key is not a valid header value"))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .default_headers(headers)
            .user_agent(concat!("hush-metadata/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let table_url = format!(
            "{}/rest/v1/{}",
            config.base_url.trim_end_matches('/'),
            config.table
        );

        Ok(Self {
            http,
            table_url,
            table: config.table,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> MetadataResult<Self> {
        Self::new(RestMetadataConfig::from_env()?)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn execute_request<T, F>(&self, operation: &str, fut: F) -> MetadataResult<T>
    where
        F: std::future::Future<Output = MetadataResult<T>>,
    {
        let span = info_span!("metadata_request", operation = %operation, table = %self.table);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(
        status: StatusCode,
        url: &str,
        response: reqwest::Response,
    ) -> MetadataError {
        let body = response.text().await.unwrap_or_default();
        MetadataError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

#[async_trait]
impl MetadataStore for RestMetadataStore {
    async fn insert_video(&self, user_id: &UserId, file_url: &str) -> MetadataResult<UploadRecord> {
        let body = NewVideoRow {
            file_url,
            user_id: user_id.as_str(),
        };

        self.execute_request("insert_video", async {
            let response = self
                .http
                .post(&self.table_url)
                .header("Prefer", "return=representation")
                .json(&body)
                .send()
                .await?;
            let status = response.status();

            if !status.is_success() {
                return Err(Self::handle_error_response(status, &self.table_url, response).await);
            }

            let rows: Vec<VideoRow> = response.json().await?;
            let row = rows
                .into_iter()
                .next()
                .ok_or_else(|| MetadataError::invalid_response("insert returned no rows"))?;

            debug!(user_id = %user_id, "Inserted video record");
            Ok(row.into_record())
        })
        .await
    }

    async fn list_videos(&self, user_id: &UserId) -> MetadataResult<Vec<UploadRecord>> {
        let filter = format!("eq.{}", user_id);

        self.execute_request("list_videos", async {
            let response = self
                .http
                .get(&self.table_url)
                .query(&[("select", "*"), ("userId", filter.as_str())])
                .send()
                .await?;
            let status = response.status();

            if !status.is_success() {
                return Err(Self::handle_error_response(status, &self.table_url, response).await);
            }

            let rows: Vec<VideoRow> = response.json().await?;
            Ok(rows.into_iter().map(VideoRow::into_record).collect())
        })
        .await
    }

    async fn check_connectivity(&self) -> MetadataResult<()> {
        self.execute_request("check_connectivity", async {
            let response = self
                .http
                .get(&self.table_url)
                .query(&[("select", "*"), ("limit", "1")])
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                Ok(())
            } else {
                Err(Self::handle_error_response(status, &self.table_url, response).await)
            }
        })
        .await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> RestMetadataStore {
        RestMetadataStore::new(RestMetadataConfig {
            base_url: server.uri(),
            service_key: "service-key".to_string(),
            table: "Video".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_video_sends_row_and_keys() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/Video"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({
                "file_url": "https://cdn.example.com/u1/a.mp4",
                "userId": "u1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": 7,
                "file_url": "https://cdn.example.com/u1/a.mp4",
                "userId": "u1",
                "created_at": "2024-03-01T12:00:00+00:00"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let record = store_for(&server)
            .insert_video(&UserId::from("u1"), "https://cdn.example.com/u1/a.mp4")
            .await
            .unwrap();

        assert_eq!(record.id.as_deref(), Some("7"));
        assert_eq!(record.user_id.as_str(), "u1");
    }

    #[tokio::test]
    async fn test_insert_video_maps_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/Video"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .insert_video(&UserId::from("u1"), "https://cdn.example.com/u1/a.mp4")
            .await
            .unwrap_err();

        assert!(matches!(err, MetadataError::ServerError(503, _)));
    }

    #[tokio::test]
    async fn test_insert_video_with_empty_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .insert_video(&UserId::from("u1"), "x")
            .await
            .unwrap_err();

        assert!(matches!(err, MetadataError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_list_videos_filters_by_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/Video"))
            .and(query_param("userId", "eq.u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "file_url": "https://cdn.example.com/u1/a.mp4", "userId": "u1"},
                {"id": 2, "file_url": "u1/b.mp4", "userId": "u1"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let records = store_for(&server)
            .list_videos(&UserId::from("u1"))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].file_url, "u1/b.mp4");
    }

    #[tokio::test]
    async fn test_list_videos_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .list_videos(&UserId::from("u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, MetadataError::AuthError(_)));
    }

    #[test]
    #[serial]
    fn test_config_from_env_requires_url() {
        std::env::remove_var("SUPABASE_URL");
        std::env::set_var("SUPABASE_SERVICE_ROLE_KEY", "k");
        assert!(RestMetadataConfig::from_env().is_err());
        std::env::remove_var("SUPABASE_SERVICE_ROLE_KEY");
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        std::env::set_var("SUPABASE_URL", "https://proj.supabase.co");
        std::env::set_var("SUPABASE_SERVICE_ROLE_KEY", "k");
        std::env::remove_var("METADATA_TABLE");
        std::env::remove_var("METADATA_TIMEOUT_SECS");

        let config = RestMetadataConfig::from_env().unwrap();
        assert_eq!(config.table, "Video");
        assert_eq!(config.timeout, Duration::from_secs(10));

        std::env::remove_var("SUPABASE_URL");
        std::env::remove_var("SUPABASE_SERVICE_ROLE_KEY");
    }
}
