//! In-memory routing state.
//!
//! Everything here is rebuildable from a fresh start: which plugin a chat
//! is in, per-chat backend preference, and the plugin availability table.
//! Durable facts (sessions, workspaces, approvals, transcripts) live in
//! `warden-store`.

use dashmap::DashMap;
use warden_core::AgentBackendKind;

/// The plugin every deployment ships with.
pub const CODEX_PLUGIN: &str = "codex";

/// Mutable per-conversation routing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    /// Active plugin, if the chat has entered one.
    pub plugin: Option<String>,
    /// Backend override chosen with `/cli`.
    pub backend: Option<AgentBackendKind>,
    /// Whether policy-clean proposals may run without confirmation.
    /// `/cli --safe` turns this off.
    pub allow_auto_execute: bool,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            plugin: None,
            backend: None,
            allow_auto_execute: true,
        }
    }
}

/// Shared routing state across all conversations.
#[derive(Debug)]
pub struct RouterState {
    conversations: DashMap<String, ConversationState>,
    /// Plugin name to enabled flag. Governance toggles land here.
    plugins: DashMap<String, bool>,
}

impl RouterState {
    /// Fresh state with the built-in plugin enabled.
    #[must_use]
    pub fn new() -> Self {
        let plugins = DashMap::new();
        plugins.insert(CODEX_PLUGIN.to_string(), true);
        Self {
            conversations: DashMap::new(),
            plugins,
        }
    }

    /// Snapshot of one conversation's state.
    #[must_use]
    pub fn conversation(&self, conversation_id: &str) -> ConversationState {
        self.conversations
            .get(conversation_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Mutate one conversation's state in place.
    pub fn update<F>(&self, conversation_id: &str, apply: F)
    where
        F: FnOnce(&mut ConversationState),
    {
        let mut entry = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();
        apply(entry.value_mut());
    }

    /// Drop a conversation back to its defaults.
    pub fn reset_conversation(&self, conversation_id: &str) {
        self.conversations.remove(conversation_id);
    }

    /// Whether a plugin is known and enabled.
    #[must_use]
    pub fn plugin_enabled(&self, name: &str) -> bool {
        self.plugins.get(name).is_some_and(|entry| *entry.value())
    }

    /// Flip a plugin's availability. Unknown names are created on enable.
    pub fn set_plugin_enabled(&self, name: &str, enabled: bool) {
        self.plugins.insert(name.to_string(), enabled);
    }
}

impl Default for RouterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_conversation_has_defaults() {
        let state = RouterState::new();
        let conv = state.conversation("c1");
        assert_eq!(conv.plugin, None);
        assert_eq!(conv.backend, None);
        assert!(conv.allow_auto_execute);
    }

    #[test]
    fn update_persists_and_reset_clears() {
        let state = RouterState::new();
        state.update("c1", |conv| {
            conv.plugin = Some(CODEX_PLUGIN.to_string());
            conv.backend = Some(AgentBackendKind::Sdk);
            conv.allow_auto_execute = false;
        });

        let conv = state.conversation("c1");
        assert_eq!(conv.plugin.as_deref(), Some(CODEX_PLUGIN));
        assert_eq!(conv.backend, Some(AgentBackendKind::Sdk));
        assert!(!conv.allow_auto_execute);

        state.reset_conversation("c1");
        assert_eq!(state.conversation("c1"), ConversationState::default());
    }

    #[test]
    fn codex_ships_enabled_and_toggles() {
        let state = RouterState::new();
        assert!(state.plugin_enabled(CODEX_PLUGIN));
        assert!(!state.plugin_enabled("browser"));

        state.set_plugin_enabled(CODEX_PLUGIN, false);
        assert!(!state.plugin_enabled(CODEX_PLUGIN));
        state.set_plugin_enabled("browser", true);
        assert!(state.plugin_enabled("browser"));
    }
}
