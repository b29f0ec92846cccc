use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};
use voiceid_embed::SpeechService;
use voiceid_profile::{aggregate, ProfileError, VoiceProfile};

use crate::cache::LocalCache;
use crate::reconciler::SyncReconciler;
use crate::SyncError;

/// One enrollment phrase with its recorded audio.
#[derive(Debug, Clone)]
pub struct PhraseRecording {
    pub phrase: String,
    pub audio: Vec<u8>,
}

/// Drives enrollment: phrase audio through the speech service, the
/// embeddings through the aggregator, the profile into the local cache,
/// then a sync push.
pub struct Enroller {
    speech: Arc<dyn SpeechService>,
}

impl Enroller {
    pub fn new(speech: Arc<dyn SpeechService>) -> Self {
        Self { speech }
    }

    /// Enroll a speaker from ordered phrase recordings.
    ///
    /// Any failed extraction discards the whole batch, naming the
    /// failing phrase index; nothing partial is persisted. On success
    /// the profile is upserted into the local cache tagged with the
    /// current browser session, and a sync push is fired best-effort.
    pub async fn enroll(
        &self,
        user_name: &str,
        recordings: &[PhraseRecording],
        reconciler: &SyncReconciler,
    ) -> Result<VoiceProfile, SyncError> {
        let cache: &LocalCache = reconciler.cache();
        let settings = cache.settings()?;

        if recordings.len() < settings.required_phrases {
            return Err(ProfileError::InsufficientSamples {
                required: settings.required_phrases,
                got: recordings.len(),
            }
            .into());
        }

        let mut embeddings = Vec::with_capacity(recordings.len());
        for (index, rec) in recordings.iter().enumerate() {
            let embedding =
                self.speech.embed(&rec.audio).await.map_err(|e| {
                    ProfileError::ExtractionFailed {
                        index,
                        reason: e.to_string(),
                    }
                })?;
            embeddings.push(embedding.vector);
        }

        let phrases: Vec<String> = recordings.iter().map(|r| r.phrase.clone()).collect();
        let session_id = cache.browser_session_id()?;
        let profile = aggregate(
            &format!("user-{}", uuid::Uuid::new_v4()),
            user_name,
            &phrases,
            &embeddings,
            &settings,
            &session_id,
            now_ms(),
        )?;

        cache.upsert_profile(&profile)?;
        info!(
            user = user_name,
            consistency = profile.consistency_score,
            "enrollment stored"
        );

        if !reconciler.sync_to_server().await {
            warn!(user = user_name, "post-enrollment sync push did not complete");
        }

        Ok(profile)
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
