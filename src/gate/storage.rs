use std::sync::Mutex;

/// Client storage key the session token lives under.
pub const TOKEN_KEY: &str = "token";

/// Persistent client-side storage for the session token.
///
/// Absence of a token means the visitor is anonymous.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str);
    fn remove(&self);
}

/// In-memory store, lives as long as the process (one browser tab).
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.slot().clone().filter(|t| !t.is_empty())
    }

    fn set(&self, token: &str) {
        *self.slot() = Some(token.to_string());
    }

    fn remove(&self) {
        *self.slot() = None;
    }
}
