//! Configuration types.
//!
//! Every section carries serde defaults so a partial file only overrides
//! what it names, and the `Default` impls mirror the embedded
//! `defaults.toml` exactly (a test holds the two together).

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use warden_core::AgentBackendKind;
use warden_policy::{PatternSets, PolicyVariant};

/// Root configuration for the gateway.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent invocation settings.
    pub agent: AgentSection,
    /// Command policy.
    pub policy: PolicySection,
    /// Persistence settings.
    pub storage: StorageSection,
    /// Routing and outbound behavior.
    pub gateway: GatewaySection,
    /// Log level and format.
    pub logging: LoggingSection,
}

/// `[agent]` section.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// Binary the CLI backend spawns.
    pub binary: String,
    /// Default model. `None` means the agent's own default.
    pub model: Option<String>,
    /// Seconds one invocation may run.
    pub timeout_secs: u64,
    /// Backend used when a request carries no override.
    pub backend: AgentBackendKind,
    /// Agent service URL for the SDK backend.
    pub base_url: Option<String>,
    /// Bearer token for the SDK backend. Never printed or serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            binary: "codex".into(),
            model: None,
            timeout_secs: 300,
            backend: AgentBackendKind::Cli,
            base_url: None,
            api_key: None,
        }
    }
}

impl fmt::Debug for AgentSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSection")
            .field("binary", &self.binary)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

/// `[policy]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    /// Which rule family is active.
    pub variant: PolicyVariant,
    /// Commands that are never executed.
    pub block: Vec<String>,
    /// Commands that always need human confirmation.
    pub confirm: Vec<String>,
    /// Commands that may run without confirmation.
    pub allow: Vec<String>,
    /// Directories deletions may target without confirmation
    /// (safe-roots variant).
    pub safe_roots: Vec<String>,
}

impl PolicySection {
    /// The three pattern lists in evaluator form.
    #[must_use]
    pub fn pattern_sets(&self) -> PatternSets {
        PatternSets {
            block: self.block.clone(),
            confirm: self.confirm.clone(),
            allow: self.allow.clone(),
        }
    }
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            variant: PolicyVariant::PatternTriad,
            block: vec![
                "rm -rf /".into(),
                "mkfs".into(),
                "shutdown".into(),
                "reboot".into(),
            ],
            confirm: vec![
                "rm -rf".into(),
                "git push --force".into(),
                "git reset --hard".into(),
                "drop table".into(),
            ],
            allow: vec![
                "ls".into(),
                "cat".into(),
                "grep".into(),
                "git status".into(),
                "git diff".into(),
                "git log".into(),
                "cargo check".into(),
                "cargo test".into(),
            ],
            safe_roots: Vec::new(),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Which store backs persistence.
    pub backend: StorageBackend,
    /// On-disk location for the `kv` backend. `None` resolves to
    /// `~/.warden/data` at startup.
    pub path: Option<PathBuf>,
}

/// Persistence backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-memory, lost on restart.
    Memory,
    /// Embedded persistent KV store.
    #[default]
    Kv,
}

/// `[gateway]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Language hint embedded in prompts. Empty disables the hint.
    pub language: String,
    /// How many transcript turns ride along as proposal context.
    pub context_turns: usize,
    /// Outbound messages are chunked to at most this many bytes.
    pub chunk_limit: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            language: "English".into(),
            context_turns: 20,
            chunk_limit: 3500,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive string; `RUST_LOG` still wins at runtime.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn,wardend=info,warden_router=info".into(),
            format: LogFormat::Text,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_reports_key_presence_without_the_value() {
        let section = AgentSection {
            api_key: Some("sk-secret-12345".into()),
            ..AgentSection::default()
        };
        let rendered = format!("{section:?}");
        assert!(!rendered.contains("sk-secret-12345"));
        assert!(rendered.contains("has_api_key: true"));
    }

    #[test]
    fn serialize_omits_the_api_key() {
        let section = AgentSection {
            api_key: Some("sk-secret-12345".into()),
            ..AgentSection::default()
        };
        let json = serde_json::to_string(&section).unwrap();
        assert!(!json.contains("sk-secret-12345"));
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn partial_section_keeps_the_other_defaults() {
        let config: Config = toml::from_str("[agent]\nbinary = \"my-agent\"\n").unwrap();
        assert_eq!(config.agent.binary, "my-agent");
        assert_eq!(config.agent.timeout_secs, 300);
        assert_eq!(config.policy, PolicySection::default());
    }

    #[test]
    fn backend_names_round_trip() {
        let config: Config =
            toml::from_str("[agent]\nbackend = \"sdk\"\n[storage]\nbackend = \"memory\"\n")
                .unwrap();
        assert_eq!(config.agent.backend, AgentBackendKind::Sdk);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn pattern_sets_copies_the_three_lists() {
        let section = PolicySection::default();
        let sets = section.pattern_sets();
        assert_eq!(sets.block, section.block);
        assert_eq!(sets.confirm, section.confirm);
        assert_eq!(sets.allow, section.allow);
    }
}
