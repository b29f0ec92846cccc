//! Redb-backed persistent registry implementation.

use std::path::Path;

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use voiceid_profile::{VoiceProfile, VoiceSettings};

use crate::store::{RegistryStore, sort_newest_first};
use crate::RegistryError;

/// Profiles keyed by user id, serialized as JSON.
const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

/// Settings and other singletons, keyed by name.
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

const SETTINGS_KEY: &str = "settings";

/// A persistent [`RegistryStore`] backed by redb.
///
/// Every write runs in one redb write transaction, so readers never see
/// a torn state.
pub struct RedbRegistry {
    db: Database,
}

impl RedbRegistry {
    /// Open or create a registry database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let db = Database::create(path).map_err(storage)?;

        // Create the tables if they don't exist.
        let tx = db.begin_write().map_err(storage)?;
        {
            let _ = tx.open_table(PROFILES).map_err(storage)?;
            let _ = tx.open_table(META).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        Ok(Self { db })
    }

    fn read_profiles(&self) -> Result<Vec<VoiceProfile>, RegistryError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(PROFILES).map_err(storage)?;

        let mut profiles = Vec::new();
        for item in table.iter().map_err(storage)? {
            let (_, value) = item.map_err(storage)?;
            let profile: VoiceProfile = serde_json::from_slice(value.value())
                .map_err(|e| RegistryError::Serialization(e.to_string()))?;
            profiles.push(profile);
        }
        sort_newest_first(&mut profiles);
        Ok(profiles)
    }
}

impl RegistryStore for RedbRegistry {
    fn all_profiles(&self) -> Result<Vec<VoiceProfile>, RegistryError> {
        self.read_profiles()
    }

    fn profiles_for_session(&self, session_id: &str) -> Result<Vec<VoiceProfile>, RegistryError> {
        let mut profiles = self.read_profiles()?;
        profiles.retain(|p| p.browser_session_id == session_id);
        Ok(profiles)
    }

    fn upsert_profile(&self, profile: &VoiceProfile) -> Result<(), RegistryError> {
        let value = serde_json::to_vec(profile)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;

        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(PROFILES).map_err(storage)?;
            table
                .insert(profile.user_id.as_str(), value.as_slice())
                .map_err(storage)?;
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }

    fn delete_profile(&self, user_id: &str) -> Result<bool, RegistryError> {
        let tx = self.db.begin_write().map_err(storage)?;
        let existed;
        {
            let mut table = tx.open_table(PROFILES).map_err(storage)?;
            existed = table.remove(user_id).map_err(storage)?.is_some();
        }
        tx.commit().map_err(storage)?;
        Ok(existed)
    }

    fn count(&self) -> Result<usize, RegistryError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(PROFILES).map_err(storage)?;
        Ok(table.len().map_err(storage)? as usize)
    }

    fn clear(&self) -> Result<(), RegistryError> {
        // Wipe and settings reset commit together.
        let tx = self.db.begin_write().map_err(storage)?;
        {
            tx.delete_table(PROFILES).map_err(storage)?;
            let _ = tx.open_table(PROFILES).map_err(storage)?;

            let defaults = serde_json::to_vec(&VoiceSettings::default())
                .map_err(|e| RegistryError::Serialization(e.to_string()))?;
            let mut meta = tx.open_table(META).map_err(storage)?;
            meta.insert(SETTINGS_KEY, defaults.as_slice()).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }

    fn settings(&self) -> Result<VoiceSettings, RegistryError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(META).map_err(storage)?;
        match table.get(SETTINGS_KEY).map_err(storage)? {
            Some(value) => serde_json::from_slice(value.value())
                .map_err(|e| RegistryError::Serialization(e.to_string())),
            None => Ok(VoiceSettings::default()),
        }
    }

    fn set_settings(&self, settings: &VoiceSettings) -> Result<(), RegistryError> {
        let value = serde_json::to_vec(settings)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;

        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(META).map_err(storage)?;
            table.insert(SETTINGS_KEY, value.as_slice()).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }
}

fn storage<E: std::fmt::Display>(e: E) -> RegistryError {
    RegistryError::Storage(e.to_string())
}
