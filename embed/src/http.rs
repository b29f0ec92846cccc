use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::SpeechConfig;
use crate::error::EmbedError;
use crate::service::{SpeechService, VoiceEmbedding};

/// Embedding request body.
#[derive(Serialize)]
struct AudioRequest<'a> {
    audio: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    model: &'a str,
}

/// Embedding response body.
#[derive(Deserialize)]
struct EmbeddingResponse {
    success: bool,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    embedding_dimension: usize,
    #[serde(default)]
    model: String,
    #[serde(default)]
    error: Option<String>,
}

/// Transcription response body.
#[derive(Deserialize)]
struct TranscriptionResponse {
    success: bool,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Speech service client over HTTP.
///
/// POSTs base64 audio to `{base}/embed` and `{base}/transcribe`.
/// Any OpenAI-style embedding proxy exposing this shape works.
pub struct HttpSpeechService {
    client: Client,
    base_url: String,
    model: String,
}

impl HttpSpeechService {
    pub fn new(base_url: &str) -> Self {
        Self::with_config(SpeechConfig::default().with_base_url(base_url))
    }

    pub fn with_config(cfg: SpeechConfig) -> Self {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model,
        }
    }

    async fn post_audio<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        audio: &[u8],
    ) -> Result<T, EmbedError> {
        let url = format!("{}/{path}", self.base_url);
        let body = AudioRequest {
            audio: base64::engine::general_purpose::STANDARD.encode(audio),
            model: &self.model,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbedError::Api(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Api(format!("HTTP {status}: {body}")));
        }

        resp.json().await.map_err(|e| EmbedError::Api(e.to_string()))
    }
}

#[async_trait::async_trait]
impl SpeechService for HttpSpeechService {
    async fn embed(&self, audio: &[u8]) -> Result<VoiceEmbedding, EmbedError> {
        if audio.is_empty() {
            return Err(EmbedError::EmptyAudio);
        }

        let resp: EmbeddingResponse = self.post_audio("embed", audio).await?;
        if !resp.success {
            return Err(EmbedError::ServiceFailure(
                resp.error.unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        let vector = resp.embedding.ok_or(EmbedError::MissingEmbedding)?;
        if vector.is_empty() {
            return Err(EmbedError::MissingEmbedding);
        }
        let dimension = if resp.embedding_dimension > 0 {
            resp.embedding_dimension
        } else {
            vector.len()
        };

        Ok(VoiceEmbedding {
            vector,
            dimension,
            model: resp.model,
        })
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, EmbedError> {
        if audio.is_empty() {
            return Err(EmbedError::EmptyAudio);
        }

        let resp: TranscriptionResponse = self.post_audio("transcribe", audio).await?;
        if !resp.success {
            return Err(EmbedError::ServiceFailure(
                resp.error.unwrap_or_else(|| "unknown".to_string()),
            ));
        }
        resp.transcript.ok_or(EmbedError::MissingEmbedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_response_parses() {
        let json = r#"{"success":true,"embedding":[0.1,0.2],"embedding_dimension":2,"model":"ecapa"}"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert!(resp.success);
        assert_eq!(resp.embedding.unwrap(), vec![0.1, 0.2]);
        assert_eq!(resp.embedding_dimension, 2);
        assert_eq!(resp.model, "ecapa");
    }

    #[test]
    fn embedding_response_failure_parses() {
        let json = r#"{"success":false,"error":"decode failed"}"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("decode failed"));
        assert!(resp.embedding.is_none());
    }

    #[test]
    fn transcription_response_parses() {
        let json = r#"{"success":true,"transcript":"hello assistant"}"#;
        let resp: TranscriptionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.transcript.as_deref(), Some("hello assistant"));
    }

    #[test]
    fn request_encodes_audio_base64() {
        let body = AudioRequest {
            audio: base64::engine::general_purpose::STANDARD.encode(b"abc"),
            model: "",
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("YWJj"));
        // Empty model is omitted.
        assert!(!json.contains("model"));
    }

    #[tokio::test]
    async fn empty_audio_rejected_before_network() {
        let svc = HttpSpeechService::new("http://127.0.0.1:1/voice");
        let err = svc.embed(&[]).await.unwrap_err();
        assert!(matches!(err, EmbedError::EmptyAudio));
        let err = svc.transcribe(&[]).await.unwrap_err();
        assert!(matches!(err, EmbedError::EmptyAudio));
    }
}
