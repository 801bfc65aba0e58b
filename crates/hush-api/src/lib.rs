//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST /upload`: run an uploaded video through the enhancement pipeline
//! - `GET /api/videos`: the caller's processed videos
//! - Bearer token authentication
//! - Rate limiting, CORS and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, Authenticator, JwtAuthenticator};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
