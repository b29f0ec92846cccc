use std::sync::Arc;

use voiceid_profile::{VoiceProfile, VoiceSettings};

use crate::keys;
use crate::local::LocalStore;
use crate::unlock::UnlockState;
use crate::SyncError;

/// Typed accessors over the client-local persisted entries.
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn LocalStore>,
}

impl LocalCache {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// The cached profile list. Empty if never written.
    pub fn profiles(&self) -> Result<Vec<VoiceProfile>, SyncError> {
        self.get_json(keys::PROFILES)
            .map(|opt| opt.unwrap_or_default())
    }

    pub fn set_profiles(&self, profiles: &[VoiceProfile]) -> Result<(), SyncError> {
        self.set_json(keys::PROFILES, &profiles)
    }

    /// Replace the profile with the same user id, or append.
    pub fn upsert_profile(&self, profile: &VoiceProfile) -> Result<(), SyncError> {
        let mut profiles = self.profiles()?;
        match profiles.iter_mut().find(|p| p.user_id == profile.user_id) {
            Some(existing) => *existing = profile.clone(),
            None => profiles.push(profile.clone()),
        }
        self.set_profiles(&profiles)
    }

    /// Cached settings; defaults if never written.
    pub fn settings(&self) -> Result<VoiceSettings, SyncError> {
        self.get_json(keys::SETTINGS)
            .map(|opt| opt.unwrap_or_default())
    }

    pub fn set_settings(&self, settings: &VoiceSettings) -> Result<(), SyncError> {
        self.set_json(keys::SETTINGS, settings)
    }

    /// Last successful push, unix milliseconds.
    pub fn last_sync(&self) -> Result<Option<i64>, SyncError> {
        match self.store.get(keys::LAST_SYNC)? {
            Some(raw) => {
                let s = String::from_utf8_lossy(&raw);
                Ok(s.parse::<i64>().ok())
            }
            None => Ok(None),
        }
    }

    pub fn set_last_sync(&self, at_ms: i64) -> Result<(), SyncError> {
        self.store.set(keys::LAST_SYNC, at_ms.to_string().as_bytes())
    }

    /// The partition key for this client instance.
    ///
    /// Generated and persisted on first read; never regenerated except
    /// through [`LocalCache::wipe`].
    pub fn browser_session_id(&self) -> Result<String, SyncError> {
        if let Some(raw) = self.store.get(keys::BROWSER_SESSION)? {
            return Ok(String::from_utf8_lossy(&raw).into_owned());
        }
        let id = format!("bs-{}", uuid::Uuid::new_v4());
        self.store.set(keys::BROWSER_SESSION, id.as_bytes())?;
        Ok(id)
    }

    /// Current unlock record, if any has been written.
    pub fn unlock(&self) -> Result<Option<UnlockState>, SyncError> {
        self.get_json(keys::UNLOCK)
    }

    pub fn set_unlock(&self, state: &UnlockState) -> Result<(), SyncError> {
        self.set_json(keys::UNLOCK, state)
    }

    pub fn clear_unlock(&self) -> Result<(), SyncError> {
        self.store.delete(keys::UNLOCK)
    }

    /// Explicit data wipe: every entry including the browser session id.
    pub fn wipe(&self) -> Result<(), SyncError> {
        for key in keys::ALL {
            self.store.delete(key)?;
        }
        Ok(())
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SyncError> {
        match self.store.get(key)? {
            Some(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| SyncError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), SyncError> {
        let raw =
            serde_json::to_vec(value).map_err(|e| SyncError::Serialization(e.to_string()))?;
        self.store.set(key, &raw)
    }
}
