use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::GateConfig;

/// Successful answer from the verification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedSession {
    pub authenticated: bool,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// Why a token could not be confirmed. Every variant counts as "not
/// authenticated"; the distinction only matters for logging and retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("token rejected by verifier")]
    Unauthorized,
    #[error("verifier answered with status {0}")]
    Status(u16),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl VerifyError {
    pub fn is_transport(&self) -> bool {
        matches!(self, VerifyError::Transport(_))
    }
}

/// Remote authority on token validity.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedSession, VerifyError>;
}

/// Calls `GET <verify-endpoint>` with `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpVerifier {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| anyhow::anyhow!("invalid verify endpoint '{}': {}", endpoint, e))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &GateConfig) -> anyhow::Result<Self> {
        Self::new(&config.verify_url, config.verify_timeout())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SessionVerifier for HttpVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedSession, VerifyError> {
        let resp = self
            .client
            .get(self.endpoint.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        match resp.status() {
            StatusCode::OK => {
                let session = resp
                    .json::<VerifiedSession>()
                    .await
                    .map_err(|e| VerifyError::Transport(format!("unreadable verify response: {}", e)))?;

                if session.authenticated {
                    Ok(session)
                } else {
                    Err(VerifyError::Unauthorized)
                }
            }
            StatusCode::UNAUTHORIZED => Err(VerifyError::Unauthorized),
            other => Err(VerifyError::Status(other.as_u16())),
        }
    }
}
