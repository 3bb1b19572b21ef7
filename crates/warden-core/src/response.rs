//! Agent invocation response types.

use serde::{Deserialize, Serialize};

/// Outcome of an agent invocation, as seen by the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentResponse {
    /// A plain user-facing answer.
    Message {
        /// Text to relay to the user.
        text: String,
        /// True when this answer came from an auto-approved execute run.
        #[serde(default)]
        auto_executed: bool,
        /// True when the agent's output lacked the structured envelope and
        /// was relayed as-is.
        #[serde(default)]
        unparsed: bool,
    },
    /// The agent proposed actions that require human sign-off.
    ///
    /// The carried `approval_id` is disposable: the router mints the durable
    /// id when it persists the approval record.
    NeedsApproval {
        /// Conversational preface the agent proposed for the user.
        text: String,
        /// Disposable id minted during parsing.
        approval_id: String,
        /// Short summary of the proposed actions.
        summary: String,
    },
}

impl AgentResponse {
    /// A plain message with no annotations.
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message {
            text: text.into(),
            auto_executed: false,
            unparsed: false,
        }
    }

    /// The text carried by either variant.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Message { text, .. } | Self::NeedsApproval { text, .. } => text,
        }
    }

    /// Whether this response asks for human sign-off.
    #[must_use]
    pub fn needs_approval(&self) -> bool {
        matches!(self, Self::NeedsApproval { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_with_type_tag() {
        let resp = AgentResponse::message("done");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"message\""));
    }

    #[test]
    fn needs_approval_round_trips() {
        let resp = AgentResponse::NeedsApproval {
            text: "I plan to run a migration".into(),
            approval_id: "appr_1_aaaa".into(),
            summary: "run migration".into(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        let back: AgentResponse = serde_json::from_str(&json).unwrap();
        assert!(back.needs_approval());
        assert_eq!(back.text(), "I plan to run a migration");
    }

    #[test]
    fn annotation_flags_default_false() {
        let json = r#"{"type":"message","text":"hi"}"#;
        let resp: AgentResponse = serde_json::from_str(json).unwrap();
        match resp {
            AgentResponse::Message {
                auto_executed,
                unparsed,
                ..
            } => {
                assert!(!auto_executed);
                assert!(!unparsed);
            },
            AgentResponse::NeedsApproval { .. } => panic!("wrong variant"),
        }
    }
}
