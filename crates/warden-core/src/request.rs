//! Agent invocation request types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which backend carries out an agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentBackendKind {
    /// Spawn the agent CLI binary per invocation.
    Cli,
    /// Drive a conversational thread over the agent's SDK/HTTP API.
    Sdk,
}

impl fmt::Display for AgentBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Sdk => write!(f, "sdk"),
        }
    }
}

impl FromStr for AgentBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" => Ok(Self::Cli),
            "sdk" => Ok(Self::Sdk),
            other => Err(format!("unknown backend `{other}` (expected cli or sdk)")),
        }
    }
}

/// Agent invocation mode.
///
/// Proposal mode analyzes a request and reports intended actions without
/// executing them; execute mode is granted permission to act and produces
/// only a final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Read-only analysis; the agent emits the structured proposal envelope.
    Proposal,
    /// Authorized execution; the agent replies with free text only.
    Execute,
}

/// Role of a prior turn in the running context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextRole {
    /// A message authored by the human.
    User,
    /// A message authored by the agent.
    Assistant,
}

/// One prior turn carried into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    /// Who authored the turn.
    pub role: ContextRole,
    /// Turn text.
    pub content: String,
}

impl ContextMessage {
    /// A user-authored turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::User,
            content: content.into(),
        }
    }

    /// An assistant-authored turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single agent invocation request.
///
/// Constructed fresh per turn by the router and immutable once handed to
/// the runner. Serializable because it is embedded verbatim in approval
/// payloads and replayed on confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    /// Owning conversation.
    pub conversation_id: String,
    /// The user's message text for this turn.
    pub user_text: String,
    /// Per-turn model override, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
    /// Per-turn backend override, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_override: Option<AgentBackendKind>,
    /// Prior turns, oldest first.
    #[serde(default)]
    pub context: Vec<ContextMessage>,
    /// Whether a policy-clean proposal may be executed without asking the
    /// human first. Conversations in safe mode turn this off; every action
    /// then goes through an approval record.
    #[serde(default = "default_allow_auto_execute")]
    pub allow_auto_execute: bool,
}

fn default_allow_auto_execute() -> bool {
    true
}

impl AgentRequest {
    /// Build a request with no overrides and empty context.
    #[must_use]
    pub fn new(conversation_id: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_text: user_text.into(),
            model_override: None,
            backend_override: None,
            context: Vec::new(),
            allow_auto_execute: true,
        }
    }

    /// Attach prior turns (oldest first).
    #[must_use]
    pub fn with_context(mut self, context: Vec<ContextMessage>) -> Self {
        self.context = context;
        self
    }

    /// Set a per-turn model override.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    /// Set a per-turn backend override.
    #[must_use]
    pub fn with_backend(mut self, backend: AgentBackendKind) -> Self {
        self.backend_override = Some(backend);
        self
    }

    /// Require human confirmation even for policy-clean proposals.
    #[must_use]
    pub fn without_auto_execute(mut self) -> Self {
        self.allow_auto_execute = false;
        self
    }
}
