use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::gate::cache::CACHE_TTL_SECS;
use crate::gate::routes::PublicRoutes;
use crate::gate::session::VerifyRetry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub gate: GateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Signing secret for session tokens. Never serialized.
    #[serde(skip_serializing, default)]
    pub jwt_secret: Option<String>,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

/// Client-side gate settings: where to verify, where to send rejected
/// visitors, and how long a positive verdict is trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub verify_url: String,
    pub login_route: String,
    pub cache_ttl_secs: u64,
    pub verify_timeout_secs: u64,
    pub transport_retries: u32,
    pub retry_backoff_ms: u64,
    pub public_routes: PublicRoutes,
}

impl GateConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }

    pub fn retry(&self) -> VerifyRetry {
        VerifyRetry {
            attempts: self.transport_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

impl SecurityConfig {
    /// Returns the signing secret, treating an empty value as absent.
    pub fn secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref().filter(|s| !s.trim().is_empty())
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Some(v) = env::var("TRILHA_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = Some(v);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Gate overrides
        if let Ok(v) = env::var("GATE_VERIFY_URL") {
            self.gate.verify_url = v;
        }
        if let Ok(v) = env::var("GATE_LOGIN_ROUTE") {
            self.gate.login_route = v;
        }
        if let Ok(v) = env::var("GATE_CACHE_TTL_SECS") {
            self.gate.cache_ttl_secs = v.parse().unwrap_or(self.gate.cache_ttl_secs);
        }
        if let Ok(v) = env::var("GATE_VERIFY_TIMEOUT_SECS") {
            self.gate.verify_timeout_secs = v.parse().unwrap_or(self.gate.verify_timeout_secs);
        }
        if let Ok(v) = env::var("GATE_TRANSPORT_RETRIES") {
            self.gate.transport_retries = v.parse().unwrap_or(self.gate.transport_retries);
        }
        if let Ok(v) = env::var("GATE_RETRY_BACKOFF_MS") {
            self.gate.retry_backoff_ms = v.parse().unwrap_or(self.gate.retry_backoff_ms);
        }
        if let Ok(path) = env::var("GATE_ROUTES_FILE") {
            match PublicRoutes::from_yaml_file(&path) {
                Ok(routes) => self.gate.public_routes = routes,
                Err(e) => tracing::warn!("Ignoring route file '{}': {:#}", path, e),
            }
        }

        self
    }

    fn gate_defaults() -> GateConfig {
        GateConfig {
            verify_url: "http://localhost:4000/api/auth/verify".to_string(),
            login_route: "/pages/login".to_string(),
            cache_ttl_secs: CACHE_TTL_SECS as u64,
            verify_timeout_secs: 10,
            transport_retries: 0,
            retry_backoff_ms: 250,
            public_routes: PublicRoutes::default(),
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                port: 4000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: None,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:3001".to_string()],
            },
            gate: Self::gate_defaults(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                port: 4000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: None,
                enable_cors: true,
                cors_origins: vec!["https://staging.trilha.app".to_string()],
            },
            gate: GateConfig {
                verify_url: "https://api.staging.trilha.app/api/auth/verify".to_string(),
                ..Self::gate_defaults()
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                port: 4000,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                jwt_secret: None,
                enable_cors: true,
                cors_origins: vec!["https://trilha.app".to_string()],
            },
            gate: GateConfig {
                verify_url: "https://api.trilha.app/api/auth/verify".to_string(),
                verify_timeout_secs: 5,
                ..Self::gate_defaults()
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
