use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::LocalCache;
use crate::SyncError;

/// Default unlock lifetime: 30 minutes.
pub const DEFAULT_TTL_MS: i64 = 30 * 60 * 1000;

/// Remaining lifetime at which the session counts as expiring: 5 minutes.
pub const EXPIRING_SOON_MS: i64 = 5 * 60 * 1000;

/// The TTL-bounded "unlocked identity" record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockState {
    pub is_unlocked: bool,
    pub identified_user: String,
    pub identified_user_id: String,
    pub confidence: f32,
    pub unlock_timestamp: i64,
    pub browser_session_id: String,
    pub expiration_time: i64,
}

/// Manages the unlock record stored in the local cache.
///
/// Expiry is lazy: an expired record is treated as absent and purged on
/// the next read. The clock is injectable so expiry is testable.
pub struct UnlockManager {
    cache: LocalCache,
    ttl_ms: i64,
    now_ms: fn() -> i64,
}

impl UnlockManager {
    pub fn new(cache: LocalCache) -> Self {
        Self {
            cache,
            ttl_ms: DEFAULT_TTL_MS,
            now_ms: system_now_ms,
        }
    }

    pub fn with_ttl(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    /// Replace the wall clock. Test hook.
    pub fn with_clock(mut self, now_ms: fn() -> i64) -> Self {
        self.now_ms = now_ms;
        self
    }

    /// Record a successful identification and start a fresh TTL window.
    pub fn update_with_identification(
        &self,
        user_name: &str,
        user_id: &str,
        confidence: f32,
    ) -> Result<UnlockState, SyncError> {
        let now = (self.now_ms)();
        let state = UnlockState {
            is_unlocked: true,
            identified_user: user_name.to_string(),
            identified_user_id: user_id.to_string(),
            confidence,
            unlock_timestamp: now,
            browser_session_id: self.cache.browser_session_id()?,
            expiration_time: now + self.ttl_ms,
        };
        self.cache.set_unlock(&state)?;
        debug!(user = user_name, confidence, "session unlocked");
        Ok(state)
    }

    /// Current unexpired record; purges an expired one.
    pub fn current(&self) -> Option<UnlockState> {
        let state = self.cache.unlock().ok().flatten()?;
        if (self.now_ms)() > state.expiration_time {
            let _ = self.cache.clear_unlock();
            return None;
        }
        Some(state)
    }

    /// Whether an unexpired unlock record exists.
    pub fn is_unlocked(&self) -> bool {
        self.current().map(|s| s.is_unlocked).unwrap_or(false)
    }

    /// Reset the expiration without changing the identity.
    /// Returns false when no live record exists.
    pub fn extend(&self) -> bool {
        let Some(mut state) = self.current() else {
            return false;
        };
        state.expiration_time = (self.now_ms)() + self.ttl_ms;
        self.cache.set_unlock(&state).is_ok()
    }

    /// Whether the remaining lifetime is at or below the warning window.
    pub fn is_expiring_soon(&self) -> bool {
        match self.current() {
            Some(state) => state.expiration_time - (self.now_ms)() <= EXPIRING_SOON_MS,
            None => false,
        }
    }

    /// Drop the record regardless of expiry.
    pub fn lock(&self) -> Result<(), SyncError> {
        self.cache.clear_unlock()
    }
}

fn system_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
