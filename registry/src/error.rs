use thiserror::Error;

/// Errors that can occur in registry store operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry: not found")]
    NotFound,

    #[error("registry: storage error: {0}")]
    Storage(String),

    #[error("registry: serialization error: {0}")]
    Serialization(String),
}
