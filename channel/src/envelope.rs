//! Wire envelope types and inbound normalization.
//!
//! Outgoing messages are a tagged `{type, payload}` pair. Inbound
//! broadcasts arrive loosely shaped — the routing id may live in
//! `channelId` or `roomId`, and correlation id / audio / identity
//! fields may sit at several metadata locations. [`Broadcast::normalize`]
//! builds one explicit envelope at the ingress boundary so everything
//! downstream consumes uniform optional fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing wire envelope: `{type, payload}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientEnvelope {
    #[serde(rename = "ROOM_JOIN")]
    RoomJoin(RoomJoin),

    #[serde(rename = "SEND_MESSAGE")]
    SendMessage(TurnMessage),
}

impl ClientEnvelope {
    pub fn room_join(room_id: &str, entity_id: &str) -> Self {
        Self::RoomJoin(RoomJoin {
            room_id: room_id.to_string(),
            entity_id: entity_id.to_string(),
        })
    }
}

/// Payload of a ROOM_JOIN envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoin {
    pub room_id: String,
    pub entity_id: String,
}

/// Payload of a SEND_MESSAGE envelope: one voice turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnMessage {
    pub source_tag: String,
    pub session_id: String,
    /// Base64-encoded audio.
    pub audio_payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    pub browser_session_id: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    /// Flow marker for request messages ("identify", "register").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Display name carried by registration requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

/// An inbound broadcast exactly as the transport delivers it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBroadcast {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub thought: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// A normalized inbound event, built once at the ingress boundary.
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    /// Resolved routing id: `channelId`, else `roomId`, else empty.
    pub channel_id: String,
    pub thought: Option<String>,
    pub correlation_id: Option<String>,
    /// Base64 audio, wherever the sender put it.
    pub audio: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub success: Option<bool>,
    /// The original metadata, kept for fields not lifted above.
    pub metadata: Option<Value>,
}

impl Broadcast {
    /// Resolve the loose wire shape into explicit fields.
    pub fn normalize(raw: RawBroadcast) -> Self {
        let channel_id = raw
            .channel_id
            .or(raw.room_id)
            .unwrap_or_default();

        let meta = raw.metadata;
        let correlation_id = probe_str(meta.as_ref(), &["correlationId", "correlation_id"]);
        let audio = probe_str(meta.as_ref(), &["audio", "audioPayload"])
            .or_else(|| nested_str(meta.as_ref(), "payload", "audio"));
        let user_id = probe_str(meta.as_ref(), &["userId", "user_id"]);
        let user_name = probe_str(meta.as_ref(), &["userName", "user_name"]);
        let success = meta
            .as_ref()
            .and_then(|m| m.get("success"))
            .and_then(Value::as_bool);

        Self {
            sender_id: raw.sender_id,
            sender_name: raw.sender_name,
            text: raw.text,
            channel_id,
            thought: raw.thought,
            correlation_id,
            audio,
            user_id,
            user_name,
            success,
            metadata: meta,
        }
    }
}

fn probe_str(meta: Option<&Value>, keys: &[&str]) -> Option<String> {
    let meta = meta?;
    for key in keys {
        if let Some(s) = meta.get(key).and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }
    None
}

fn nested_str(meta: Option<&Value>, outer: &str, inner: &str) -> Option<String> {
    meta?
        .get(outer)?
        .get(inner)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn room_join_wire_shape() {
        let env = ClientEnvelope::room_join("ch-123", "client-1");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "ROOM_JOIN");
        assert_eq!(json["payload"]["roomId"], "ch-123");
        assert_eq!(json["payload"]["entityId"], "client-1");
    }

    #[test]
    fn send_message_wire_shape() {
        let env = ClientEnvelope::SendMessage(TurnMessage {
            source_tag: "voice".into(),
            session_id: "vs-1".into(),
            audio_payload: "QUJD".into(),
            transcript: Some("hello".into()),
            browser_session_id: "bs-1".into(),
            timestamp: 1_700_000_000_000,
            action: None,
            correlation_id: None,
            user_name: None,
        });
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "SEND_MESSAGE");
        assert_eq!(json["payload"]["sourceTag"], "voice");
        assert_eq!(json["payload"]["audioPayload"], "QUJD");
        // Absent optionals are omitted from the wire.
        assert!(json["payload"].get("action").is_none());
    }

    #[test]
    fn normalize_prefers_channel_id_over_room_id() {
        let b = Broadcast::normalize(RawBroadcast {
            channel_id: Some("ch-1".into()),
            room_id: Some("room-1".into()),
            ..Default::default()
        });
        assert_eq!(b.channel_id, "ch-1");

        let b = Broadcast::normalize(RawBroadcast {
            room_id: Some("room-1".into()),
            ..Default::default()
        });
        assert_eq!(b.channel_id, "room-1");

        let b = Broadcast::normalize(RawBroadcast::default());
        assert_eq!(b.channel_id, "");
    }

    #[test]
    fn normalize_probes_correlation_id_spellings() {
        for key in ["correlationId", "correlation_id"] {
            let b = Broadcast::normalize(RawBroadcast {
                metadata: Some(json!({ key: "corr-1" })),
                ..Default::default()
            });
            assert_eq!(b.correlation_id.as_deref(), Some("corr-1"), "key {key}");
        }
    }

    #[test]
    fn normalize_probes_audio_locations() {
        let direct = Broadcast::normalize(RawBroadcast {
            metadata: Some(json!({ "audio": "QQ==" })),
            ..Default::default()
        });
        assert_eq!(direct.audio.as_deref(), Some("QQ=="));

        let alt = Broadcast::normalize(RawBroadcast {
            metadata: Some(json!({ "audioPayload": "Qg==" })),
            ..Default::default()
        });
        assert_eq!(alt.audio.as_deref(), Some("Qg=="));

        let nested = Broadcast::normalize(RawBroadcast {
            metadata: Some(json!({ "payload": { "audio": "Qw==" } })),
            ..Default::default()
        });
        assert_eq!(nested.audio.as_deref(), Some("Qw=="));
    }

    #[test]
    fn normalize_lifts_identity_fields() {
        let b = Broadcast::normalize(RawBroadcast {
            metadata: Some(json!({
                "success": true,
                "userId": "user-9",
                "userName": "Alice",
            })),
            ..Default::default()
        });
        assert_eq!(b.success, Some(true));
        assert_eq!(b.user_id.as_deref(), Some("user-9"));
        assert_eq!(b.user_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn raw_broadcast_tolerates_sparse_json() {
        let raw: RawBroadcast =
            serde_json::from_str(r#"{"senderId":"agent-1","text":"hi"}"#).unwrap();
        assert_eq!(raw.sender_id, "agent-1");
        assert!(raw.channel_id.is_none());
        assert!(raw.metadata.is_none());
    }

    #[test]
    fn turn_message_round_trip() {
        let msg = TurnMessage {
            source_tag: "voice".into(),
            session_id: "vs-1".into(),
            audio_payload: "QUJD".into(),
            transcript: None,
            browser_session_id: "bs-1".into(),
            timestamp: 42,
            action: Some("identify".into()),
            correlation_id: Some("corr-1".into()),
            user_name: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"correlationId\":\"corr-1\""));
        let restored: TurnMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.action.as_deref(), Some("identify"));
        assert_eq!(restored.timestamp, 42);
    }
}
