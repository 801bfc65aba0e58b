//! Bearer token authentication.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use hush_models::UserId;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Default audience of Supabase user access tokens.
const DEFAULT_AUDIENCE: &str = "authenticated";

/// Turns a bearer credential into a user identity.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> ApiResult<AuthUser>;
}

/// Claims of a Supabase access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseClaims {
    /// User ID
    pub sub: String,
    /// Email (if available)
    pub email: Option<String>,
    /// Database role, usually "authenticated"
    pub role: Option<String>,
    /// Audience
    pub aud: String,
    /// Expiration
    pub exp: i64,
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl From<SupabaseClaims> for AuthUser {
    fn from(claims: SupabaseClaims) -> Self {
        Self {
            user_id: UserId::new(claims.sub),
            email: claims.email,
        }
    }
}

/// Verifies HS256 tokens signed with the project's JWT secret.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &[u8], audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Create from `SUPABASE_JWT_SECRET` and `SUPABASE_JWT_AUDIENCE`.
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("SUPABASE_JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("SUPABASE_JWT_SECRET not set"))?;
        if secret.is_empty() {
            anyhow::bail!("SUPABASE_JWT_SECRET cannot be empty");
        }
        let audience = std::env::var("SUPABASE_JWT_AUDIENCE")
            .unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string());

        Ok(Self::new(secret.as_bytes(), &audience))
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> ApiResult<AuthUser> {
        let token_data = decode::<SupabaseClaims>(token, &self.key, &self.validation)
            .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {}", e)))?;

        if token_data.claims.sub.is_empty() {
            return Err(ApiError::unauthorized("Token has no subject"));
        }

        debug!(user_id = %token_data.claims.sub, "Authenticated request");
        Ok(AuthUser::from(token_data.claims))
    }
}

/// Axum extractor for authenticated user.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        state.auth.authenticate(token).await
    }
}
