use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Positive verdicts are trusted for this long.
pub const CACHE_TTL_SECS: i64 = 30;

/// Last verification verdict seen in this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub token: Option<String>,
    pub is_valid: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            token: None,
            is_valid: None,
            timestamp: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheRead {
    Hit,
    Miss,
}

/// Single-entry validity cache shared by every gate in a browser session.
///
/// Only a fresh, positive verdict for the exact same token is a hit; negative
/// verdicts are stored for inspection but always force re-verification.
#[derive(Debug)]
pub struct ValidityCache {
    entry: Mutex<CacheEntry>,
    ttl: Duration,
}

impl ValidityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: Mutex::new(CacheEntry::empty(DateTime::<Utc>::MIN_UTC)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn read(&self, token: &str, now: DateTime<Utc>) -> CacheRead {
        let entry = self.lock();
        let same_token = entry.token.as_deref() == Some(token);
        let positive = entry.is_valid == Some(true);
        let fresh = now - entry.timestamp < self.ttl;

        if same_token && positive && fresh {
            CacheRead::Hit
        } else {
            CacheRead::Miss
        }
    }

    /// Overwrite the entry. Passing `None` for both fields clears it.
    pub fn write(&self, token: Option<&str>, is_valid: Option<bool>, now: DateTime<Utc>) {
        *self.lock() = CacheEntry {
            token: token.map(str::to_string),
            is_valid,
            timestamp: now,
        };
    }

    pub fn entry(&self) -> CacheEntry {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheEntry> {
        // Entry is plain data; a panic mid-write cannot leave it inconsistent.
        self.entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ValidityCache {
    fn default() -> Self {
        Self::new(Duration::seconds(CACHE_TTL_SECS))
    }
}
