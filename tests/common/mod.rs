#![allow(dead_code)]

use std::collections::VecDeque;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tokio::sync::watch;

use trilha_gate::gate::flight::Verdict;
use trilha_gate::gate::{
    Clock, GateDeps, GateOptions, MemoryTokenStore, RecordingNavigator, SessionContext, SessionGate,
    SessionVerifier, VerifiedSession, VerifyError,
};

pub const SECRET: &str = "integration-test-secret";

// =============================================================================
// Spawned server
// =============================================================================

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_trilha-gate"))
            .env("TRILHA_API_PORT", port.to_string())
            .env("JWT_SECRET", SECRET)
            .env("APP_ENV", "development")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        let server = Self { port, base_url, child };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// =============================================================================
// Scripted collaborators for gate scenarios
// =============================================================================

pub fn ok_session(user: &str) -> Verdict {
    Ok(VerifiedSession {
        authenticated: true,
        user_id: Some(user.to_string()),
    })
}

/// Verifier that replays scripted verdicts (the last one repeats) and can be
/// held open until the test releases it.
pub struct ScriptedVerifier {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Verdict>>,
    open: watch::Receiver<bool>,
}

impl ScriptedVerifier {
    pub fn new(script: Vec<Verdict>) -> Arc<Self> {
        let (_, open) = watch::channel(true);
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
            open,
        })
    }

    /// Verifier whose calls block until the returned sender publishes `true`.
    pub fn held(script: Vec<Verdict>) -> (Arc<Self>, watch::Sender<bool>) {
        let (tx, open) = watch::channel(false);
        let verifier = Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
            open,
        });
        (verifier, tx)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_verdict(&self) -> Verdict {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap_or(Err(VerifyError::Unauthorized))
        }
    }
}

#[async_trait]
impl SessionVerifier for ScriptedVerifier {
    async fn verify(&self, _token: &str) -> Result<VerifiedSession, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.clone();
        // A dropped sender on a non-held verifier simply means "open".
        let _ = open.wait_for(|open| *open).await;
        self.next_verdict()
    }
}

pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Utc::now())))
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// One browser session: shared context, storage, navigator and clock.
pub struct Browser {
    pub context: Arc<SessionContext>,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub clock: Arc<ManualClock>,
    pub verifier: Arc<dyn SessionVerifier>,
    pub options: GateOptions,
}

impl Browser {
    pub fn new(verifier: Arc<dyn SessionVerifier>) -> Self {
        Self {
            context: Arc::new(SessionContext::default()),
            store: Arc::new(MemoryTokenStore::new()),
            navigator: Arc::new(RecordingNavigator::new()),
            clock: ManualClock::new(),
            verifier,
            options: GateOptions::default(),
        }
    }

    pub fn with_token(self, token: &str) -> Self {
        use trilha_gate::gate::TokenStore;
        self.store.set(token);
        self
    }

    pub fn deps(&self) -> GateDeps {
        GateDeps::new(
            self.context.clone(),
            self.verifier.clone(),
            self.store.clone(),
            self.navigator.clone(),
        )
        .with_clock(self.clock.clone())
    }

    pub fn mount(&self, path: &str) -> SessionGate {
        SessionGate::mount(self.deps(), self.options.clone(), Some(path))
    }
}
