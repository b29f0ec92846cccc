use thiserror::Error;

/// Errors that can occur in local cache and sync operations.
///
/// The reconciler's public surface reports booleans only; these errors
/// circulate internally and in the enrollment path.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("sync: storage error: {0}")]
    Storage(String),

    #[error("sync: serialization error: {0}")]
    Serialization(String),

    #[error("sync: remote error: {0}")]
    Remote(String),

    #[error(transparent)]
    Profile(#[from] voiceid_profile::ProfileError),

    #[error(transparent)]
    Embed(#[from] voiceid_embed::EmbedError),
}
