//! Session and channel lifecycle types.

use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ChannelError;

/// Lifecycle of a channel binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Uninitialized,
    ChannelCreating,
    Joining,
    Active,
    Ended,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Uninitialized => "uninitialized",
            ChannelState::ChannelCreating => "channel_creating",
            ChannelState::Joining => "joining",
            ChannelState::Active => "active",
            ChannelState::Ended => "ended",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The external conversational backend that allocates routing channels.
///
/// Allocation is keyed by session id: asking again for the same session
/// returns the same channel.
#[async_trait::async_trait]
pub trait ChannelProvider: Send + Sync {
    async fn channel_for(&self, session_id: &str) -> Result<String, ChannelError>;
}

/// An ephemeral conversation session bound to a routing channel.
///
/// Not durably persisted beyond the transport's own channel bookkeeping;
/// ended explicitly or implicitly superseded by creating a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSession {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub agent_id: String,
    /// Unix milliseconds.
    pub created_at: i64,
    pub tag: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl VoiceSession {
    pub fn new(id: String, channel_id: String, user_id: &str, agent_id: &str) -> Self {
        Self {
            id,
            channel_id,
            user_id: user_id.to_string(),
            agent_id: agent_id.to_string(),
            created_at: now_ms(),
            tag: "voice".to_string(),
            metadata: HashMap::new(),
        }
    }
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display() {
        assert_eq!(ChannelState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(ChannelState::ChannelCreating.to_string(), "channel_creating");
        assert_eq!(ChannelState::Active.to_string(), "active");
        assert_eq!(ChannelState::Ended.to_string(), "ended");
    }

    #[test]
    fn new_session_is_tagged_voice() {
        let s = VoiceSession::new("vs-1".into(), "ch-1".into(), "user-1", "agent-1");
        assert_eq!(s.tag, "voice");
        assert_eq!(s.channel_id, "ch-1");
        assert!(s.created_at > 0);
        assert!(s.metadata.is_empty());
    }
}
