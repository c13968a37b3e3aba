use axum::{Extension, Json};
use serde::Serialize;

use crate::auth;
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub authenticated: bool,
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
    pub expires_in: i64,
}

/// GET /api/auth/verify - confirm that the bearer token is valid
///
/// The middleware has already rejected missing, malformed, forged and expired
/// tokens with 401, so reaching this handler means the session is good.
///
/// ```json
/// { "authenticated": true, "userId": "64f1c0ffee" }
/// ```
pub async fn verify(Extension(user): Extension<AuthUser>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        authenticated: true,
        user_id: user.identity.id,
    })
}

/// POST /api/auth/refresh - trade a valid token for a fresh seven-day one
pub async fn refresh(Extension(user): Extension<AuthUser>) -> Result<Json<RefreshResponse>, ApiError> {
    let token = auth::issue(&user.identity)?;
    tracing::info!("Refreshed session for user {}", user.identity.id);

    Ok(Json(RefreshResponse {
        token,
        expires_in: auth::TOKEN_LIFETIME_SECS,
    }))
}
