use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{self, IdentityClaims, SessionClaims};
use crate::config;
use crate::error::ApiError;

/// Authenticated user context extracted from the session token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub identity: IdentityClaims,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl From<SessionClaims> for AuthUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            identity: claims.identity,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::unauthorized)?;

    let claims = validate_jwt(&token).map_err(|msg| {
        tracing::debug!("Rejected token {}: {}", auth::fingerprint(&token), msg);
        ApiError::unauthorized(msg)
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err("Empty bearer token".to_string()),
        Some(token) => Ok(token.trim().to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

/// Validate the token against the configured secret and extract claims
fn validate_jwt(token: &str) -> Result<SessionClaims, String> {
    let secret = config::config()
        .security
        .secret()
        .ok_or_else(|| "JWT secret not configured".to_string())?;

    auth::decode(token, secret).map_err(|e| format!("Invalid session token: {}", e))
}
