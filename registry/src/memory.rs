use std::sync::RwLock;

use voiceid_profile::{VoiceProfile, VoiceSettings};

use crate::store::{RegistryStore, sort_newest_first};
use crate::RegistryError;

/// In-memory [`RegistryStore`] implementation.
/// Data is lost on restart. Suitable for testing or ephemeral use.
pub struct MemoryRegistry {
    inner: RwLock<Inner>,
}

struct Inner {
    profiles: Vec<VoiceProfile>,
    settings: VoiceSettings,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                profiles: Vec::new(),
                settings: VoiceSettings::default(),
            }),
        }
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryStore for MemoryRegistry {
    fn all_profiles(&self) -> Result<Vec<VoiceProfile>, RegistryError> {
        let inner = self.inner.read().unwrap();
        let mut profiles = inner.profiles.clone();
        sort_newest_first(&mut profiles);
        Ok(profiles)
    }

    fn profiles_for_session(&self, session_id: &str) -> Result<Vec<VoiceProfile>, RegistryError> {
        let inner = self.inner.read().unwrap();
        let mut profiles: Vec<VoiceProfile> = inner
            .profiles
            .iter()
            .filter(|p| p.browser_session_id == session_id)
            .cloned()
            .collect();
        sort_newest_first(&mut profiles);
        Ok(profiles)
    }

    fn upsert_profile(&self, profile: &VoiceProfile) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().unwrap();
        match inner.profiles.iter_mut().find(|p| p.user_id == profile.user_id) {
            Some(existing) => *existing = profile.clone(),
            None => inner.profiles.push(profile.clone()),
        }
        Ok(())
    }

    fn delete_profile(&self, user_id: &str) -> Result<bool, RegistryError> {
        let mut inner = self.inner.write().unwrap();
        let before = inner.profiles.len();
        inner.profiles.retain(|p| p.user_id != user_id);
        Ok(inner.profiles.len() < before)
    }

    fn count(&self) -> Result<usize, RegistryError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.profiles.len())
    }

    fn clear(&self) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().unwrap();
        inner.profiles.clear();
        inner.settings = VoiceSettings::default();
        Ok(())
    }

    fn settings(&self) -> Result<VoiceSettings, RegistryError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.settings.clone())
    }

    fn set_settings(&self, settings: &VoiceSettings) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().unwrap();
        inner.settings = settings.clone();
        Ok(())
    }
}
