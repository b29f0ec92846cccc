use crate::error::EmbedError;

/// A voice embedding returned by the external service.
#[derive(Debug, Clone)]
pub struct VoiceEmbedding {
    /// Dense float32 vector representing the sample's acoustic signature.
    pub vector: Vec<f32>,

    /// Dimension reported by the service. Matches `vector.len()`.
    pub dimension: usize,

    /// Model identifier reported by the service.
    pub model: String,
}

/// SpeechService converts raw audio into embeddings or transcripts.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait::async_trait]
pub trait SpeechService: Send + Sync {
    /// Return the embedding vector for one audio sample.
    async fn embed(&self, audio: &[u8]) -> Result<VoiceEmbedding, EmbedError>;

    /// Return the transcript for one audio sample.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, EmbedError>;
}
