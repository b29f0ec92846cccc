use voiceid_profile::{VoiceProfile, VoiceSettings};

use crate::RegistryError;

/// Session-partitioned CRUD over voice profiles and global settings.
///
/// Implementations must be safe for concurrent use, and each write must
/// be atomic: no reader observes a torn intermediate state.
pub trait RegistryStore: Send + Sync {
    /// All profiles, newest enrollment first.
    fn all_profiles(&self) -> Result<Vec<VoiceProfile>, RegistryError>;

    /// Profiles belonging to one browser session, newest first.
    fn profiles_for_session(&self, session_id: &str) -> Result<Vec<VoiceProfile>, RegistryError>;

    /// Replace the profile with the same user id, or append.
    fn upsert_profile(&self, profile: &VoiceProfile) -> Result<(), RegistryError>;

    /// Remove a profile. Returns false if the user id was unknown.
    fn delete_profile(&self, user_id: &str) -> Result<bool, RegistryError>;

    /// Number of stored profiles.
    fn count(&self) -> Result<usize, RegistryError>;

    /// Wipe all profiles and reset settings to defaults.
    fn clear(&self) -> Result<(), RegistryError>;

    /// Current settings (defaults if never written).
    fn settings(&self) -> Result<VoiceSettings, RegistryError>;

    /// Replace the settings.
    fn set_settings(&self, settings: &VoiceSettings) -> Result<(), RegistryError>;
}

/// Sort newest enrollment first, preserving input order on ties.
pub(crate) fn sort_newest_first(profiles: &mut [VoiceProfile]) {
    profiles.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
}
