use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use voiceid_profile::{
    identify, search, IdentificationResult, ProfileSummary, ScoredName, VoiceProfile,
    VoiceSettings,
};

use crate::store::RegistryStore;
use crate::RegistryError;

/// Default candidate count for search when the caller gives none.
const DEFAULT_TOP_K: usize = 5;

/// Full registry contents for one scope: what a sync pull transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    pub profiles: Vec<VoiceProfile>,
    pub settings: VoiceSettings,
}

/// Aggregate counters for the stats surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub profiles: usize,
    pub sessions: usize,
    pub dimensions: Vec<usize>,
}

/// One row of the embeddings listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRow {
    pub user_id: String,
    pub user_name: String,
    pub embedding: Vec<f32>,
}

/// Identification, search, and bulk operations over a [`RegistryStore`].
///
/// Constructed once at startup and passed by handle to consumers.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn RegistryStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RegistryStore> {
        &self.store
    }

    fn scope(&self, session: Option<&str>) -> Result<Vec<VoiceProfile>, RegistryError> {
        match session {
            Some(id) => self.store.profiles_for_session(id),
            None => self.store.all_profiles(),
        }
    }

    /// Nearest-match identification over the scoped partition.
    /// Falls back to the stored settings' threshold when none is given.
    pub fn identify(
        &self,
        probe: &[f32],
        threshold: Option<f32>,
        session: Option<&str>,
    ) -> Result<IdentificationResult, RegistryError> {
        let threshold = match threshold {
            Some(t) => t,
            None => self.store.settings()?.identification_threshold,
        };
        let profiles = self.scope(session)?;
        let result = identify(probe, &profiles, threshold);
        debug!(
            identified = result.identified,
            confidence = result.confidence,
            candidates = result.all_scores.len(),
            "identify"
        );
        Ok(result)
    }

    /// Top-K scoring without a threshold gate.
    pub fn search(
        &self,
        probe: &[f32],
        top_k: Option<usize>,
        session: Option<&str>,
    ) -> Result<Vec<ScoredName>, RegistryError> {
        let profiles = self.scope(session)?;
        Ok(search(probe, &profiles, top_k.unwrap_or(DEFAULT_TOP_K)))
    }

    /// Upsert a batch of profiles (the sync push target).
    /// Returns the number of profiles written.
    pub fn upsert_batch(&self, profiles: &[VoiceProfile]) -> Result<usize, RegistryError> {
        for profile in profiles {
            self.store.upsert_profile(profile)?;
        }
        Ok(profiles.len())
    }

    /// Profiles + settings for a scope (the sync pull target).
    pub fn snapshot(&self, session: Option<&str>) -> Result<RegistrySnapshot, RegistryError> {
        Ok(RegistrySnapshot {
            profiles: self.scope(session)?,
            settings: self.store.settings()?,
        })
    }

    /// Embeddings-free summaries for list surfaces.
    pub fn summaries(&self, session: Option<&str>) -> Result<Vec<ProfileSummary>, RegistryError> {
        Ok(self.scope(session)?.iter().map(|p| p.summary()).collect())
    }

    /// All centroids with their owners.
    pub fn embeddings(&self) -> Result<Vec<EmbeddingRow>, RegistryError> {
        Ok(self
            .store
            .all_profiles()?
            .into_iter()
            .map(|p| EmbeddingRow {
                user_id: p.user_id,
                user_name: p.user_name,
                embedding: p.voice_embedding,
            })
            .collect())
    }

    /// Profile count, distinct sessions, and distinct dimensions.
    pub fn stats(&self) -> Result<RegistryStats, RegistryError> {
        let profiles = self.store.all_profiles()?;
        let sessions: BTreeSet<&str> = profiles
            .iter()
            .map(|p| p.browser_session_id.as_str())
            .collect();
        let dimensions: BTreeSet<usize> = profiles.iter().map(|p| p.dimension()).collect();
        Ok(RegistryStats {
            profiles: profiles.len(),
            sessions: sessions.len(),
            dimensions: dimensions.into_iter().collect(),
        })
    }
}
