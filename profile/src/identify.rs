use crate::cosine::cosine_similarity;
use crate::types::{IdentificationResult, ScoredName, VoiceProfile};

/// Match a probe embedding against every profile in scope.
///
/// Profiles are scored by cosine similarity against their centroid and
/// ranked descending; ties keep the input order (stable sort). The best
/// candidate clears `identified` only at or above `threshold`. An empty
/// scope yields [`IdentificationResult::none`].
pub fn identify(
    probe: &[f32],
    profiles: &[VoiceProfile],
    threshold: f32,
) -> IdentificationResult {
    if profiles.is_empty() {
        return IdentificationResult::none();
    }

    let mut ranked: Vec<(usize, f32)> = profiles
        .iter()
        .enumerate()
        .map(|(i, p)| (i, cosine_similarity(probe, &p.voice_embedding)))
        .collect();
    // Stable sort: equal scores keep input order.
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let all_scores: Vec<ScoredName> = ranked
        .iter()
        .map(|&(i, score)| ScoredName {
            name: profiles[i].user_name.clone(),
            score,
        })
        .collect();

    let (best_idx, best_score) = ranked[0];
    let identified = best_score >= threshold;

    IdentificationResult {
        identified,
        profile: identified.then(|| profiles[best_idx].clone()),
        confidence: best_score,
        all_scores,
    }
}

/// Score every profile against the probe and return the top K.
/// Same scoring as [`identify`], no threshold gate.
pub fn search(probe: &[f32], profiles: &[VoiceProfile], top_k: usize) -> Vec<ScoredName> {
    let mut ranked: Vec<ScoredName> = profiles
        .iter()
        .map(|p| ScoredName {
            name: p.user_name.clone(),
            score: cosine_similarity(probe, &p.voice_embedding),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(top_k);
    ranked
}
