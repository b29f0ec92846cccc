use thiserror::Error;

/// Errors returned by channel and correlation operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel: invalid state: {0}")]
    InvalidState(&'static str),

    #[error("channel: closed")]
    Closed,

    #[error("channel: timed out waiting for correlated response")]
    Timeout,

    #[error("channel: transport error: {0}")]
    Transport(String),

    #[error("channel: serialization error: {0}")]
    Serialization(String),

    #[error("channel: backend error: {0}")]
    Backend(String),

    #[error("channel: unexpected response: {0}")]
    UnexpectedResponse(String),
}
