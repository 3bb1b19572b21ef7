//! Inbound message shape at the transport boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as delivered by the transport layer.
///
/// The transport is responsible for mention detection and sender identity;
/// the router only consumes the resulting flags. The original platform
/// event rides along untouched in [`raw`](Self::raw) for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Chat (conversation) identifier, opaque to the core.
    pub chat_id: String,
    /// Sender identifier, opaque to the core.
    pub sender_id: String,
    /// Whether the message arrived in a group chat.
    pub is_group: bool,
    /// Whether the bot was explicitly mentioned. Always `true` in private
    /// chats.
    pub mentioned: bool,
    /// Message text, already stripped of the mention token by the transport.
    pub text: String,
    /// Delivery timestamp.
    pub timestamp: DateTime<Utc>,
    /// Opaque raw platform event, passed through unparsed.
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl InboundMessage {
    /// Build a private (non-group) message. Private messages always count
    /// as mentioned.
    #[must_use]
    pub fn private(
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            is_group: false,
            mentioned: true,
            text: text.into(),
            timestamp: Utc::now(),
            raw: serde_json::Value::Null,
        }
    }

    /// Build a group message with an explicit mention flag.
    #[must_use]
    pub fn group(
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
        mentioned: bool,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            is_group: true,
            mentioned,
            text: text.into(),
            timestamp: Utc::now(),
            raw: serde_json::Value::Null,
        }
    }

    /// Attach the raw platform event.
    #[must_use]
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_is_always_mentioned() {
        let msg = InboundMessage::private("c1", "u1", "hello");
        assert!(!msg.is_group);
        assert!(msg.mentioned);
    }

    #[test]
    fn group_carries_mention_flag() {
        let msg = InboundMessage::group("c1", "u1", "hello", false);
        assert!(msg.is_group);
        assert!(!msg.mentioned);
    }

    #[test]
    fn raw_defaults_to_null_on_deserialize() {
        let json = r#"{
            "chat_id": "c1",
            "sender_id": "u1",
            "is_group": false,
            "mentioned": true,
            "text": "hi",
            "timestamp": "2026-01-01T00:00:00Z"
        }"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert!(msg.raw.is_null());
    }
}
