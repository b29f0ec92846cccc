//! Wake-phrase matching over transcripts.
//!
//! A transcript matches when its normalized edit-distance similarity to
//! the known phrase reaches the threshold, or when either string
//! contains the other (substring fallback for transcripts with leading
//! or trailing speech).

/// Default similarity threshold for a wake-phrase match.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Normalized edit-distance similarity: `(max_len - distance) / max_len`.
///
/// 1.0 for identical strings, 0.0 for fully dissimilar. Two empty
/// strings are identical.
pub fn phrase_similarity(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(&a, &b);
    (max_len - distance) as f32 / max_len as f32
}

/// Whether a transcript matches the wake phrase at the given threshold.
/// Comparison is case-insensitive over trimmed input.
pub fn matches_phrase(transcript: &str, phrase: &str, threshold: f32) -> bool {
    let t = transcript.trim().to_lowercase();
    let p = phrase.trim().to_lowercase();
    if t.is_empty() || p.is_empty() {
        return false;
    }
    if t.contains(&p) || p.contains(&t) {
        return true;
    }
    phrase_similarity(&t, &p) >= threshold
}

/// Classic two-row Levenshtein distance.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
