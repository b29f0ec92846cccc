//! Client-side state for voice identification.
//!
//! Enrollment happens client-side (microphone access) while lookups
//! must be centrally queryable, so a local cache and the canonical
//! registry have to converge. This crate holds:
//!
//! - [`LocalCache`]: the persisted client state — profile list,
//!   settings, last-sync timestamp, browser session id, and the unlock
//!   record, each an independent keyed entry.
//! - [`UnlockManager`]: the TTL-bounded "unlocked identity" record.
//! - [`SyncReconciler`]: bidirectional, idempotent reconciliation with
//!   the registry server, guarded by an in-progress flag (skip, not
//!   queue). Failures are logged and reported as `false`, never thrown.
//! - [`Enroller`]: drives phrase extraction through the speech service,
//!   aggregates a profile, stores it locally, and pushes a sync.

mod cache;
mod enroll;
mod error;
pub mod keys;
mod local;
mod reconciler;
mod remote;
mod unlock;

pub use cache::LocalCache;
pub use enroll::{Enroller, PhraseRecording};
pub use error::SyncError;
pub use local::{LocalStore, MemoryLocalStore, RedbLocalStore};
pub use reconciler::SyncReconciler;
pub use remote::{HttpRegistryClient, RemoteRegistry};
pub use unlock::{UnlockManager, UnlockState};
