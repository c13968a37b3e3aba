use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use trilha_gate::config::{self, AppConfig};
use trilha_gate::handlers::{protected, public};
use trilha_gate::middleware::{edge_route_filter, jwt_auth_middleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up JWT_SECRET, PORT, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting Trilha session gate in {:?} mode", config.environment);

    // Refuse to serve without a signing secret: every token would be unverifiable.
    if config.security.secret().is_none() {
        anyhow::bail!("JWT_SECRET is not configured; refusing to start");
    }

    let app = app(config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Trilha session gate listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn app(config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected
        .merge(auth_routes())
        .fallback(public::not_found)
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(cors_layer(config))
                .layer(middleware::from_fn(edge_route_filter)),
        );

    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

fn auth_routes() -> Router {
    use protected::auth;

    Router::new()
        .route("/api/auth/verify", get(auth::verify))
        .route("/api/auth/refresh", post(auth::refresh))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
