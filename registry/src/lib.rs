//! Durable, session-partitioned voice profile registry.
//!
//! [`RegistryStore`] is the storage seam: profile CRUD partitioned by
//! browser session id, plus global settings. Each write is one atomic
//! transaction; no reader observes a torn state.
//!
//! Implementations:
//! - [`MemoryRegistry`]: `RwLock` inner, for tests and ephemeral use.
//! - [`RedbRegistry`]: redb-backed persistence.
//!
//! [`Registry`] layers identification, search, batch upsert, and stats
//! over any store.

mod error;
mod memory;
mod redb;
mod registry;
mod store;

pub use error::RegistryError;
pub use memory::MemoryRegistry;
pub use redb::RedbRegistry;
pub use registry::{EmbeddingRow, Registry, RegistrySnapshot, RegistryStats};
pub use store::RegistryStore;
