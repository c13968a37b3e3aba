mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::Value;

use common::{Browser, TestServer, SECRET};
use trilha_gate::auth::{self, IdentityClaims};
use trilha_gate::gate::{GateState, HttpVerifier, SessionVerifier, TokenStore, Transition, VerifyError};

fn learner_token(secret: &str) -> Result<String> {
    let identity = IdentityClaims::new("64f1c0ffee").with_email("ana@trilha.app");
    Ok(auth::issue_at(&identity, secret, Utc::now())?)
}

fn verifier_for(server: &TestServer) -> Result<HttpVerifier> {
    HttpVerifier::new(&server.url("/api/auth/verify"), Duration::from_secs(5))
}

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = TestServer::start().await?;

    let res = reqwest::get(server.url("/health")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn issued_token_verifies_over_http() -> Result<()> {
    let server = TestServer::start().await?;
    let verifier = verifier_for(&server)?;

    let session = verifier.verify(&learner_token(SECRET)?).await?;

    assert!(session.authenticated);
    assert_eq!(session.user_id.as_deref(), Some("64f1c0ffee"));
    Ok(())
}

#[tokio::test]
async fn forged_token_is_rejected_with_401() -> Result<()> {
    let server = TestServer::start().await?;
    let verifier = verifier_for(&server)?;

    let forged = learner_token("not-the-server-secret")?;
    assert_eq!(verifier.verify(&forged).await, Err(VerifyError::Unauthorized));
    Ok(())
}

#[tokio::test]
async fn missing_bearer_is_401_json() -> Result<()> {
    let server = TestServer::start().await?;

    let res = reqwest::get(server.url("/api/auth/verify")).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn refresh_returns_a_fresh_token_for_the_same_identity() -> Result<()> {
    let server = TestServer::start().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/api/auth/refresh"))
        .bearer_auth(learner_token(SECRET)?)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert_eq!(body["expires_in"], 604_800);

    let token = body["token"].as_str().unwrap_or_default();
    let claims = auth::decode(token, SECRET)?;
    assert_eq!(claims.identity.id, "64f1c0ffee");
    assert_eq!(claims.identity.email.as_deref(), Some("ana@trilha.app"));
    assert_eq!(claims.exp - claims.iat, 604_800);
    Ok(())
}

#[tokio::test]
async fn gate_authenticates_against_live_verifier() -> Result<()> {
    let server = TestServer::start().await?;

    let browser = Browser::new(Arc::new(verifier_for(&server)?)).with_token(&learner_token(SECRET)?);
    let gate = browser.mount("/pages/trilhas");

    let transition = gate.navigate(Some("/pages/trilhas")).await;
    assert_eq!(transition, Transition::Settled(GateState::Authenticated));
    assert!(browser.navigator.redirects().is_empty());
    Ok(())
}

#[tokio::test]
async fn gate_purges_forged_token_against_live_verifier() -> Result<()> {
    let server = TestServer::start().await?;

    let browser = Browser::new(Arc::new(verifier_for(&server)?)).with_token(&learner_token("forged")?);
    let gate = browser.mount("/pages/trilhas");

    let transition = gate.navigate(Some("/pages/trilhas")).await;
    assert_eq!(transition, Transition::Settled(GateState::Unauthenticated));
    assert_eq!(browser.store.get(), None);
    assert_eq!(browser.navigator.redirects(), vec!["/pages/login".to_string()]);
    Ok(())
}

#[tokio::test]
async fn unreachable_verifier_is_a_transport_error() -> Result<()> {
    let port = portpicker::pick_unused_port().expect("free port");
    let verifier = HttpVerifier::new(&format!("http://127.0.0.1:{}/api/auth/verify", port), Duration::from_secs(2))?;

    let err = verifier.verify("a.b.c").await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err:?}");
    Ok(())
}
