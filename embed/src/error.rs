use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embed: empty audio")]
    EmptyAudio,

    #[error("embed: API error: {0}")]
    Api(String),

    #[error("embed: service reported failure: {0}")]
    ServiceFailure(String),

    #[error("embed: missing embedding in response")]
    MissingEmbedding,
}
