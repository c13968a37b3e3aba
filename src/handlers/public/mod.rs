// handlers/public/mod.rs - Routes reachable without a session token

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::error::ApiError;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Trilha Session Gate",
            "version": version,
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "verify": "/api/auth/verify (protected - token verification)",
                "refresh": "/api/auth/refresh (protected - token renewal)",
            }
        }
    }))
}

/// GET /health - liveness probe
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "status": "ok",
                "timestamp": chrono::Utc::now(),
            }
        })),
    )
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
