use thiserror::Error;

/// Errors returned by profile aggregation.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("insufficient samples: need {required} phrases, got {got}")]
    InsufficientSamples { required: usize, got: usize },

    #[error("embedding extraction failed for phrase {index}: {reason}")]
    ExtractionFailed { index: usize, reason: String },

    #[error("dimension mismatch at phrase {index}: expected {expected}, got {got}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },
}
