use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::cache::LocalCache;
use crate::remote::RemoteRegistry;
use crate::SyncError;

/// Bidirectional reconciliation between the local cache and the
/// canonical registry.
///
/// Concurrency-safe via an in-progress guard, not a queue: a caller
/// whose call overlaps a running sync simply sees `false`. Failures are
/// caught, logged, and returned as `false` — never thrown. Last writer
/// wins; conflicts are not surfaced.
pub struct SyncReconciler {
    cache: LocalCache,
    remote: Arc<dyn RemoteRegistry>,
    in_progress: AtomicBool,
}

impl SyncReconciler {
    pub fn new(cache: LocalCache, remote: Arc<dyn RemoteRegistry>) -> Self {
        Self {
            cache,
            remote,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn remote(&self) -> &Arc<dyn RemoteRegistry> {
        &self.remote
    }

    /// Push the full session-scoped local profile list and settings as
    /// upserts. Records the last-sync timestamp on success.
    ///
    /// Returns `false` immediately if a sync is already in flight.
    pub async fn sync_to_server(&self) -> bool {
        let Some(_guard) = self.acquire() else {
            debug!("sync already in progress, skipping push");
            return false;
        };

        match self.push_inner().await {
            Ok(count) => {
                debug!(count, "sync push complete");
                true
            }
            Err(e) => {
                warn!(error = %e, "sync push failed");
                false
            }
        }
    }

    /// Pull the session partition from the server, replacing the local
    /// profile list with the server's copy. Local settings are
    /// preserved.
    ///
    /// Returns `false` immediately if a sync is already in flight.
    pub async fn sync_from_server(&self) -> bool {
        let Some(_guard) = self.acquire() else {
            debug!("sync already in progress, skipping pull");
            return false;
        };

        match self.pull_inner().await {
            Ok(count) => {
                debug!(count, "sync pull complete");
                true
            }
            Err(e) => {
                warn!(error = %e, "sync pull failed");
                false
            }
        }
    }

    /// Push then pull. Returns true if either direction succeeded.
    pub async fn perform_sync(&self) -> bool {
        let pushed = self.sync_to_server().await;
        let pulled = self.sync_from_server().await;
        pushed || pulled
    }

    async fn push_inner(&self) -> Result<usize, SyncError> {
        let session_id = self.cache.browser_session_id()?;
        let profiles: Vec<_> = self
            .cache
            .profiles()?
            .into_iter()
            .filter(|p| p.browser_session_id == session_id)
            .collect();
        let settings = self.cache.settings()?;

        let count = self.remote.push(&profiles, Some(&settings)).await?;
        self.cache.set_last_sync(now_ms())?;
        Ok(count)
    }

    async fn pull_inner(&self) -> Result<usize, SyncError> {
        let session_id = self.cache.browser_session_id()?;
        let snapshot = self.remote.pull(&session_id).await?;
        // Server copy replaces the list wholesale; settings stay local.
        self.cache.set_profiles(&snapshot.profiles)?;
        Ok(snapshot.profiles.len())
    }

    fn acquire(&self) -> Option<SyncGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some(SyncGuard { flag: &self.in_progress })
    }
}

/// Releases the in-progress flag on drop, so an early return or a
/// failed future cannot leave the reconciler wedged.
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use voiceid_profile::{VoiceProfile, VoiceSettings};
    use voiceid_registry::{MemoryRegistry, Registry, RegistrySnapshot, RegistryStore};

    use super::*;
    use crate::local::MemoryLocalStore;

    /// Remote stub backed by a real in-memory registry, with an optional
    /// artificial delay to hold the in-progress window open.
    struct StubRemote {
        registry: Registry,
        delay: Duration,
    }

    impl StubRemote {
        fn new() -> Self {
            Self {
                registry: Registry::new(Arc::new(MemoryRegistry::new())),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait::async_trait]
    impl RemoteRegistry for StubRemote {
        async fn push(
            &self,
            profiles: &[VoiceProfile],
            settings: Option<&VoiceSettings>,
        ) -> Result<usize, SyncError> {
            tokio::time::sleep(self.delay).await;
            if let Some(s) = settings {
                self.registry
                    .store()
                    .set_settings(s)
                    .map_err(|e| SyncError::Remote(e.to_string()))?;
            }
            self.registry
                .upsert_batch(profiles)
                .map_err(|e| SyncError::Remote(e.to_string()))
        }

        async fn pull(&self, session_id: &str) -> Result<RegistrySnapshot, SyncError> {
            tokio::time::sleep(self.delay).await;
            self.registry
                .snapshot(Some(session_id))
                .map_err(|e| SyncError::Remote(e.to_string()))
        }

        async fn fetch_profile(&self, user_id: &str) -> Result<Option<VoiceProfile>, SyncError> {
            let all = self
                .registry
                .store()
                .all_profiles()
                .map_err(|e| SyncError::Remote(e.to_string()))?;
            Ok(all.into_iter().find(|p| p.user_id == user_id))
        }
    }

    /// Remote that always fails.
    struct DeadRemote;

    #[async_trait::async_trait]
    impl RemoteRegistry for DeadRemote {
        async fn push(
            &self,
            _profiles: &[VoiceProfile],
            _settings: Option<&VoiceSettings>,
        ) -> Result<usize, SyncError> {
            Err(SyncError::Remote("connection refused".into()))
        }

        async fn pull(&self, _session_id: &str) -> Result<RegistrySnapshot, SyncError> {
            Err(SyncError::Remote("connection refused".into()))
        }

        async fn fetch_profile(&self, _user_id: &str) -> Result<Option<VoiceProfile>, SyncError> {
            Err(SyncError::Remote("connection refused".into()))
        }
    }

    fn profile(user_id: &str, session: &str) -> VoiceProfile {
        VoiceProfile {
            user_id: user_id.to_string(),
            user_name: user_id.to_uppercase(),
            voice_embedding: vec![1.0, 0.0],
            phrase_embeddings: Vec::new(),
            phrases: Vec::new(),
            consistency_score: 1.0,
            min_consistency: 0.7,
            enrolled_at: 100,
            browser_session_id: session.to_string(),
        }
    }

    fn reconciler_with(remote: Arc<dyn RemoteRegistry>) -> SyncReconciler {
        let cache = LocalCache::new(Arc::new(MemoryLocalStore::new()));
        SyncReconciler::new(cache, remote)
    }

    #[tokio::test]
    async fn round_trip_converges_by_user_id() {
        let remote = Arc::new(StubRemote::new());
        let rec = reconciler_with(remote.clone());

        let session = rec.cache().browser_session_id().unwrap();
        rec.cache().upsert_profile(&profile("alice", &session)).unwrap();
        rec.cache().upsert_profile(&profile("bob", &session)).unwrap();

        assert!(rec.perform_sync().await);

        // Local set equals the server's session-filtered set by user id.
        let mut local: Vec<String> = rec
            .cache()
            .profiles()
            .unwrap()
            .into_iter()
            .map(|p| p.user_id)
            .collect();
        let mut server: Vec<String> = remote
            .registry
            .snapshot(Some(&session))
            .unwrap()
            .profiles
            .into_iter()
            .map(|p| p.user_id)
            .collect();
        local.sort();
        server.sort();
        assert_eq!(local, server);
        assert_eq!(local, vec!["alice".to_string(), "bob".to_string()]);

        assert!(rec.cache().last_sync().unwrap().is_some());
    }

    #[tokio::test]
    async fn repeat_sync_is_idempotent() {
        let remote = Arc::new(StubRemote::new());
        let rec = reconciler_with(remote.clone());

        let session = rec.cache().browser_session_id().unwrap();
        rec.cache().upsert_profile(&profile("alice", &session)).unwrap();

        assert!(rec.perform_sync().await);
        let after_first = rec.cache().profiles().unwrap();

        assert!(rec.perform_sync().await);
        let after_second = rec.cache().profiles().unwrap();

        assert_eq!(after_first.len(), after_second.len());
        assert_eq!(remote.registry.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_push_skips_second_caller() {
        let remote = Arc::new(StubRemote::new().with_delay(Duration::from_millis(50)));
        let rec = Arc::new(reconciler_with(remote.clone()));

        let session = rec.cache().browser_session_id().unwrap();
        rec.cache().upsert_profile(&profile("alice", &session)).unwrap();

        let a = {
            let rec = rec.clone();
            tokio::spawn(async move { rec.sync_to_server().await })
        };
        // Give the first push time to take the guard.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = rec.sync_to_server().await;
        let first = a.await.unwrap();

        assert!(first, "in-flight push should succeed");
        assert!(!second, "overlapping push must be skipped, not queued");
        assert_eq!(remote.registry.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn pull_replaces_profiles_and_preserves_settings() {
        let remote = Arc::new(StubRemote::new());
        let rec = reconciler_with(remote.clone());

        let session = rec.cache().browser_session_id().unwrap();
        // Server knows a profile this client has not seen.
        remote
            .registry
            .store()
            .upsert_profile(&profile("carol", &session))
            .unwrap();
        // Local has a stale profile and custom settings.
        rec.cache().upsert_profile(&profile("stale", &session)).unwrap();
        let custom = VoiceSettings {
            identification_threshold: 0.95,
            ..VoiceSettings::default()
        };
        rec.cache().set_settings(&custom).unwrap();

        assert!(rec.sync_from_server().await);

        let profiles = rec.cache().profiles().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].user_id, "carol");
        // Settings stay local on pull.
        assert_eq!(rec.cache().settings().unwrap().identification_threshold, 0.95);
    }

    #[tokio::test]
    async fn push_only_sends_own_partition() {
        let remote = Arc::new(StubRemote::new());
        let rec = reconciler_with(remote.clone());

        let session = rec.cache().browser_session_id().unwrap();
        rec.cache().upsert_profile(&profile("mine", &session)).unwrap();
        rec.cache().upsert_profile(&profile("foreign", "bs-other")).unwrap();

        assert!(rec.sync_to_server().await);
        assert_eq!(remote.registry.store().count().unwrap(), 1);
        let all = remote.registry.store().all_profiles().unwrap();
        assert_eq!(all[0].user_id, "mine");
    }

    #[tokio::test]
    async fn failures_report_false_never_panic() {
        let rec = reconciler_with(Arc::new(DeadRemote));
        let session = rec.cache().browser_session_id().unwrap();
        rec.cache().upsert_profile(&profile("alice", &session)).unwrap();

        assert!(!rec.sync_to_server().await);
        assert!(!rec.sync_from_server().await);
        assert!(!rec.perform_sync().await);
        // Failed push records no last-sync.
        assert_eq!(rec.cache().last_sync().unwrap(), None);
        // Guard was released: a later sync is not wedged.
        assert!(!rec.sync_to_server().await);
    }
}
