//! Client for the external voice embedding and transcription service.
//!
//! The service is consumed as an opaque network endpoint: audio bytes in,
//! a fixed-dimension embedding or a transcript out. [`SpeechService`] is
//! the seam; [`HttpSpeechService`] is the reqwest implementation.
//!
//! The [`wake`] module matches transcripts against a known wake phrase
//! using normalized edit distance with a substring fallback.

mod config;
mod error;
mod http;
mod service;
pub mod wake;

pub use config::SpeechConfig;
pub use error::EmbedError;
pub use http::HttpSpeechService;
pub use service::{SpeechService, VoiceEmbedding};
