use crate::cosine::{cosine_similarity, l2_normalize, mean_vector};
use crate::error::ProfileError;
use crate::types::{VoiceProfile, VoiceSettings};

/// Aggregate ordered phrase embeddings into a profile.
///
/// The centroid is the L2-normalized mean of the phrase embeddings; the
/// consistency score is the mean pairwise cosine similarity, defined as
/// 1.0 when fewer than two phrases exist.
///
/// Fails without partial output: fewer embeddings than
/// `settings.required_phrases` or a dimension mismatch between phrases
/// rejects the whole batch.
pub fn aggregate(
    user_id: &str,
    user_name: &str,
    phrases: &[String],
    embeddings: &[Vec<f32>],
    settings: &VoiceSettings,
    browser_session_id: &str,
    enrolled_at: i64,
) -> Result<VoiceProfile, ProfileError> {
    if embeddings.len() < settings.required_phrases {
        return Err(ProfileError::InsufficientSamples {
            required: settings.required_phrases,
            got: embeddings.len(),
        });
    }

    let expected = embeddings[0].len();
    for (index, emb) in embeddings.iter().enumerate() {
        if emb.len() != expected {
            return Err(ProfileError::DimensionMismatch {
                index,
                expected,
                got: emb.len(),
            });
        }
    }

    let mut centroid = mean_vector(embeddings);
    l2_normalize(&mut centroid);

    Ok(VoiceProfile {
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        voice_embedding: centroid,
        phrase_embeddings: embeddings.to_vec(),
        phrases: phrases.to_vec(),
        consistency_score: consistency_score(embeddings),
        min_consistency: settings.consistency_threshold,
        enrolled_at,
        browser_session_id: browser_session_id.to_string(),
    })
}

/// Mean pairwise cosine similarity across phrase embeddings.
/// 1.0 when fewer than two phrases exist.
fn consistency_score(embeddings: &[Vec<f32>]) -> f32 {
    if embeddings.len() < 2 {
        return 1.0;
    }
    let mut sum = 0.0f64;
    let mut pairs = 0u32;
    for i in 0..embeddings.len() {
        for j in (i + 1)..embeddings.len() {
            sum += cosine_similarity(&embeddings[i], &embeddings[j]) as f64;
            pairs += 1;
        }
    }
    (sum / pairs as f64) as f32
}
