//! Client-side session gate.
//!
//! Decides, for every navigation, whether the current visitor may see a page.
//! Public routes render immediately; protected routes need a stored token that
//! is either vouched for by the [`ValidityCache`] or confirmed by a single
//! in-flight call to the [`SessionVerifier`]. Any doubt ends in a purge of the
//! stored token and a redirect to the login route.

pub mod cache;
pub mod clock;
pub mod flight;
pub mod navigator;
pub mod routes;
pub mod session;
pub mod storage;
pub mod verifier;

pub use cache::{CacheEntry, CacheRead, ValidityCache, CACHE_TTL_SECS};
pub use clock::{Clock, SystemClock};
pub use navigator::{Navigator, RecordingNavigator};
pub use routes::{PublicRoutes, RouteClass};
pub use session::{
    GateDecision, GateDeps, GateOptions, GateState, Render, SessionContext, SessionGate, Transition, VerifyRetry,
};
pub use storage::{MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use verifier::{HttpVerifier, SessionVerifier, VerifiedSession, VerifyError};
