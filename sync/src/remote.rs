use reqwest::Client;
use serde::{Deserialize, Serialize};
use voiceid_profile::{VoiceProfile, VoiceSettings};
use voiceid_registry::RegistrySnapshot;

use crate::SyncError;

/// The server side of the sync surface.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait::async_trait]
pub trait RemoteRegistry: Send + Sync {
    /// Upsert the given profiles (and optionally settings) into the
    /// canonical registry. Returns the number of profiles written.
    async fn push(
        &self,
        profiles: &[VoiceProfile],
        settings: Option<&VoiceSettings>,
    ) -> Result<usize, SyncError>;

    /// Fetch the session-partitioned registry contents.
    async fn pull(&self, session_id: &str) -> Result<RegistrySnapshot, SyncError>;

    /// Fetch one authoritative profile (with embeddings), if present.
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<VoiceProfile>, SyncError>;
}

/// Uniform response envelope of the registry HTTP surface.
#[derive(Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest<'a> {
    profiles: &'a [VoiceProfile],
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<&'a VoiceSettings>,
}

#[derive(Deserialize)]
struct SyncResponseData {
    count: usize,
}

/// [`RemoteRegistry`] over the voiceidd HTTP surface.
pub struct HttpRegistryClient {
    client: Client,
    base_url: String,
}

impl HttpRegistryClient {
    /// `base_url` is the mount point, e.g. `http://host:port/api/voice`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let url = format!("{}/{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        unwrap_envelope(resp).await
    }
}

async fn unwrap_envelope<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, SyncError> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::Remote(format!("HTTP {status}: {body}")));
    }
    let envelope: ApiEnvelope<T> = resp
        .json()
        .await
        .map_err(|e| SyncError::Remote(e.to_string()))?;
    if !envelope.success {
        return Err(SyncError::Remote(
            envelope.error.unwrap_or_else(|| "unknown".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| SyncError::Remote("missing data".to_string()))
}

#[async_trait::async_trait]
impl RemoteRegistry for HttpRegistryClient {
    async fn push(
        &self,
        profiles: &[VoiceProfile],
        settings: Option<&VoiceSettings>,
    ) -> Result<usize, SyncError> {
        let url = format!("{}/sync", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&SyncRequest { profiles, settings })
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        let data: SyncResponseData = unwrap_envelope(resp).await?;
        Ok(data.count)
    }

    async fn pull(&self, session_id: &str) -> Result<RegistrySnapshot, SyncError> {
        self.get_json(&format!("registry/session?sessionId={session_id}"))
            .await
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<VoiceProfile>, SyncError> {
        // The surface has no per-user route; fetch the full registry
        // and pick the row out.
        let snapshot: RegistrySnapshot = self.get_json("registry").await?;
        Ok(snapshot.profiles.into_iter().find(|p| p.user_id == user_id))
    }
}
