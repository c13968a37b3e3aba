use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::verifier::{VerifiedSession, VerifyError};

pub type Verdict = Result<VerifiedSession, VerifyError>;

type VerdictRx = watch::Receiver<Option<Verdict>>;

/// Outcome of asking the registry for a verification slot.
pub enum Flight {
    /// No call is outstanding for this token; the holder must make it.
    Leader(FlightLease),
    /// Another gate is already verifying this token.
    Follower(VerdictRx),
}

/// Outstanding verification calls, keyed by token.
#[derive(Debug, Default)]
pub struct FlightRegistry {
    flights: Mutex<HashMap<String, VerdictRx>>,
}

impl FlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join_or_lead(registry: &Arc<Self>, token: &str) -> Flight {
        let mut flights = registry.lock();

        if let Some(rx) = flights.get(token) {
            return Flight::Follower(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        flights.insert(token.to_string(), rx);

        Flight::Leader(FlightLease {
            registry: Arc::clone(registry),
            token: token.to_string(),
            tx,
        })
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VerdictRx>> {
        self.flights.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive right to verify one token. Dropping the lease, whether after
/// `complete` or because the owning future was cancelled, releases the slot.
pub struct FlightLease {
    registry: Arc<FlightRegistry>,
    token: String,
    tx: watch::Sender<Option<Verdict>>,
}

impl FlightLease {
    /// Publish the verdict to every follower, then release the slot.
    pub fn complete(self, verdict: &Verdict) {
        // No followers is fine.
        let _ = self.tx.send(Some(verdict.clone()));
    }
}

impl Drop for FlightLease {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.token);
    }
}

/// Wait for the leader's verdict. `None` if the leader went away without one.
pub async fn await_verdict(mut rx: VerdictRx) -> Option<Verdict> {
    // Bound to a local so the borrow of `rx` ends before `rx` is dropped.
    let published = rx.wait_for(Option::is_some).await;
    match published {
        Ok(verdict) => (*verdict).clone(),
        Err(_) => None,
    }
}
