use serde::{Deserialize, Serialize};

/// A stable biometric profile built from enrollment phrases.
///
/// Field names match the registry wire surface (camelCase JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceProfile {
    /// Stable identifier, assigned at enrollment.
    pub user_id: String,

    /// Display name spoken during enrollment.
    pub user_name: String,

    /// L2-normalized mean of the phrase embeddings. The profile's
    /// canonical representation for matching.
    pub voice_embedding: Vec<f32>,

    /// Per-phrase embeddings in recording order. Same dimension as the
    /// centroid.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phrase_embeddings: Vec<Vec<f32>>,

    /// Enrollment phrases in recording order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phrases: Vec<String>,

    /// Mean pairwise cosine similarity over the phrase embeddings.
    /// 1.0 when fewer than two phrases exist.
    pub consistency_score: f32,

    /// Consistency threshold recorded at enrollment time.
    pub min_consistency: f32,

    /// Enrollment time, unix milliseconds.
    pub enrolled_at: i64,

    /// Partition key: the enrolling browser instance.
    pub browser_session_id: String,
}

impl VoiceProfile {
    /// Dimension of the centroid embedding.
    pub fn dimension(&self) -> usize {
        self.voice_embedding.len()
    }

    /// Embeddings-free projection for list surfaces.
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            phrase_count: self.phrases.len(),
            consistency_score: self.consistency_score,
            enrolled_at: self.enrolled_at,
            browser_session_id: self.browser_session_id.clone(),
            dimension: self.dimension(),
        }
    }
}

/// Embeddings-free profile projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub user_id: String,
    pub user_name: String,
    pub phrase_count: usize,
    pub consistency_score: f32,
    pub enrolled_at: i64,
    pub browser_session_id: String,
    pub dimension: usize,
}

/// Global identification settings. Not partitioned by browser session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    /// Minimum similarity for a positive identification.
    pub identification_threshold: f32,

    /// Minimum consistency score recorded into new profiles.
    pub consistency_threshold: f32,

    /// Number of enrollment phrases required to build a profile.
    pub required_phrases: usize,

    /// Base URL of the external embedding/transcription service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_url: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            identification_threshold: 0.82,
            consistency_threshold: 0.7,
            required_phrases: 3,
            service_url: String::new(),
        }
    }
}

/// One ranked candidate from identification or search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredName {
    pub name: String,
    pub score: f32,
}

/// Outcome of an identification attempt. Transient, never persisted.
///
/// `all_scores` always carries the full ranking so a caller can prompt
/// a retry with context even when nothing cleared the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationResult {
    pub identified: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<VoiceProfile>,

    pub confidence: f32,

    pub all_scores: Vec<ScoredName>,
}

impl IdentificationResult {
    /// Result for an empty candidate scope.
    pub fn none() -> Self {
        Self {
            identified: false,
            profile: None,
            confidence: 0.0,
            all_scores: Vec::new(),
        }
    }
}
