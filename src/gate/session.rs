use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cache::{CacheRead, ValidityCache};
use super::clock::{Clock, SystemClock};
use super::flight::{await_verdict, Flight, FlightRegistry, Verdict};
use super::navigator::Navigator;
use super::routes::PublicRoutes;
use super::storage::TokenStore;
use super::verifier::SessionVerifier;
use crate::auth::fingerprint;
use crate::config::GateConfig;

/// State shared by every gate in one browser session: the validity cache and
/// the registry of outstanding verification calls.
#[derive(Debug)]
pub struct SessionContext {
    cache: ValidityCache,
    flights: Arc<FlightRegistry>,
}

impl SessionContext {
    pub fn new(cache: ValidityCache) -> Self {
        Self {
            cache,
            flights: Arc::new(FlightRegistry::new()),
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(ValidityCache::new(config.cache_ttl()))
    }

    pub fn cache(&self) -> &ValidityCache {
        &self.cache
    }

    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(ValidityCache::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    Undetermined,
    Authenticated,
    Unauthenticated,
}

/// What the gate shows for a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    /// Loading placeholder only; protected content is not mounted.
    Loading,
    Children,
    /// Nothing; a redirect has already been issued.
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub authenticated: Option<bool>,
}

impl GateState {
    pub fn decision(self) -> GateDecision {
        let authenticated = match self {
            GateState::Undetermined => None,
            GateState::Authenticated => Some(true),
            GateState::Unauthenticated => Some(false),
        };
        GateDecision { authenticated }
    }

    pub fn render(self) -> Render {
        match self {
            GateState::Undetermined => Render::Loading,
            GateState::Authenticated => Render::Children,
            GateState::Unauthenticated => Render::Nothing,
        }
    }
}

/// Result of one navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Settled(GateState),
    /// A verification was already running for this gate; nothing changed.
    Skipped,
    /// The gate was unmounted before the verdict arrived; nothing applied.
    Discarded,
}

/// Retry policy for transport failures only. Server rejections are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyRetry {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for VerifyRetry {
    fn default() -> Self {
        Self {
            attempts: 0,
            backoff: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GateOptions {
    pub login_route: String,
    pub public_routes: Arc<PublicRoutes>,
    pub retry: VerifyRetry,
}

impl GateOptions {
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            login_route: config.login_route.clone(),
            public_routes: Arc::new(config.public_routes.clone()),
            retry: config.retry(),
        }
    }
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            login_route: "/pages/login".to_string(),
            public_routes: Arc::new(PublicRoutes::default()),
            retry: VerifyRetry::default(),
        }
    }
}

/// Collaborators a gate talks to. Cheap to clone so many gates can share them.
#[derive(Clone)]
pub struct GateDeps {
    pub context: Arc<SessionContext>,
    pub verifier: Arc<dyn SessionVerifier>,
    pub store: Arc<dyn TokenStore>,
    pub navigator: Arc<dyn Navigator>,
    pub clock: Arc<dyn Clock>,
}

impl GateDeps {
    pub fn new(
        context: Arc<SessionContext>,
        verifier: Arc<dyn SessionVerifier>,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            context,
            verifier,
            store,
            navigator,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Clears the per-gate verifying flag however the verification ends.
struct VerifyingGuard<'a>(&'a AtomicBool);

impl<'a> VerifyingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for VerifyingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Route guard for one mounted page.
///
/// Call [`SessionGate::navigate`] with the initial path right after mounting
/// and again on every path change; render according to [`SessionGate::render`].
pub struct SessionGate {
    id: Uuid,
    deps: GateDeps,
    options: GateOptions,
    state: Mutex<GateState>,
    verifying: AtomicBool,
    mounted: AtomicBool,
}

impl SessionGate {
    pub fn mount(deps: GateDeps, options: GateOptions, path: Option<&str>) -> Self {
        let state = if options.public_routes.is_public(path) {
            GateState::Authenticated
        } else {
            GateState::Undetermined
        };

        let id = Uuid::new_v4();
        tracing::debug!(gate = %id, ?path, ?state, "Gate mounted");

        Self {
            id,
            deps,
            options,
            state: Mutex::new(state),
            verifying: AtomicBool::new(false),
            mounted: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> GateState {
        *self.lock_state()
    }

    pub fn decision(&self) -> GateDecision {
        self.state().decision()
    }

    pub fn render(&self) -> Render {
        self.state().render()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Tear the gate down. Verdicts that arrive afterwards are dropped.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
        tracing::debug!(gate = %self.id, "Gate unmounted");
    }

    pub async fn navigate(&self, path: Option<&str>) -> Transition {
        if !self.is_mounted() {
            return Transition::Discarded;
        }

        if self.options.public_routes.is_public(path) {
            return self.settle(GateState::Authenticated);
        }

        let context = &self.deps.context;

        let Some(token) = self.deps.store.get() else {
            tracing::debug!(gate = %self.id, ?path, "No stored token, redirecting to login");
            context.cache().write(None, None, self.now());
            return self.reject();
        };

        if context.cache().read(&token, self.now()) == CacheRead::Hit {
            tracing::debug!(gate = %self.id, token = %fingerprint(&token), "Validity cache hit");
            return self.settle(GateState::Authenticated);
        }

        let Some(_verifying) = VerifyingGuard::acquire(&self.verifying) else {
            tracing::debug!(gate = %self.id, ?path, "Verification already in flight, skipping");
            return Transition::Skipped;
        };

        // Whatever rendered for the previous path stays hidden until the verdict.
        self.settle(GateState::Undetermined);

        let verdict = match FlightRegistry::join_or_lead(&context.flights, &token) {
            Flight::Leader(lease) => {
                let verdict = self.verify_with_retry(&token).await;
                lease.complete(&verdict);
                verdict
            }
            Flight::Follower(rx) => {
                tracing::debug!(gate = %self.id, token = %fingerprint(&token), "Joining verification in flight");
                match await_verdict(rx).await {
                    Some(verdict) => verdict,
                    None => return Transition::Skipped,
                }
            }
        };

        if !self.is_mounted() {
            tracing::debug!(gate = %self.id, "Gate unmounted during verification, discarding verdict");
            return Transition::Discarded;
        }

        self.apply(&token, verdict)
    }

    /// Explicit logout: forget the token and send the visitor to login.
    pub fn logout(&self) -> Transition {
        self.deps.store.remove();
        self.deps.context.cache().write(None, None, self.now());
        tracing::info!(gate = %self.id, "Logged out");
        self.reject()
    }

    async fn verify_with_retry(&self, token: &str) -> Verdict {
        let retry = self.options.retry;
        let mut attempt = 0;

        loop {
            match self.deps.verifier.verify(token).await {
                Err(e) if e.is_transport() && attempt < retry.attempts => {
                    attempt += 1;
                    tracing::warn!(gate = %self.id, attempt, "Verification transport failure, retrying: {}", e);
                    tokio::time::sleep(retry.backoff * attempt).await;
                }
                verdict => return verdict,
            }
        }
    }

    fn apply(&self, token: &str, verdict: Verdict) -> Transition {
        let cache = self.deps.context.cache();

        match verdict {
            Ok(session) => {
                tracing::info!(
                    gate = %self.id,
                    token = %fingerprint(token),
                    user = session.user_id.as_deref().unwrap_or("-"),
                    "Session verified"
                );
                cache.write(Some(token), Some(true), self.now());
                self.settle(GateState::Authenticated)
            }
            Err(e) => {
                tracing::warn!(gate = %self.id, token = %fingerprint(token), "Session rejected: {}", e);
                // A token stored after this verification started is left alone.
                if self.deps.store.get().as_deref() == Some(token) {
                    self.deps.store.remove();
                }
                cache.write(Some(token), Some(false), self.now());
                self.reject()
            }
        }
    }

    fn reject(&self) -> Transition {
        let transition = self.settle(GateState::Unauthenticated);
        self.deps.navigator.redirect(&self.options.login_route);
        transition
    }

    fn settle(&self, state: GateState) -> Transition {
        *self.lock_state() = state;
        Transition::Settled(state)
    }

    fn now(&self) -> DateTime<Utc> {
        self.deps.clock.now()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
