//! Login handler issuing bearer tokens.

use actix_web::web;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::domain::LoginCredentials;

/// Login request payload.
#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    /// Login name.
    pub username: String,
    /// Plaintext password, verified against the identity store's hash.
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Compact signed token.
    pub token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Instant after which the token is rejected as expired.
    pub expires_at: DateTime<Utc>,
}

/// `POST /api/v1/auth/login`, the only public API route.
pub async fn login<S: 'static>(
    state: web::Data<AppState<S>>,
    payload: web::Json<LoginPayload>,
) -> Result<web::Json<TokenResponse>, ApiError> {
    let credentials = LoginCredentials::try_from_parts(&payload.username, &payload.password)
        .map_err(|err| ApiError::invalid_request(err.to_string()))?;
    let signed = state.gateway.issue_token(&credentials).await?;
    Ok(web::Json(TokenResponse {
        token: signed.token,
        token_type: "Bearer",
        expires_at: signed.expires_at,
    }))
}
