//! Session continuity and per-conversation preferences.
//!
//! After an invocation the agent backend may hand back an opaque session id.
//! It is stored under the conversation AND the workspace, so a later turn on
//! either key resumes prior agent context, plus a reverse mapping from
//! session id back to workspace. Workspace and model preferences live here
//! too.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::StoreResult;
use crate::kv::KvStore;

const NS_SESSION_BY_CONVERSATION: &str = "session:by-conversation";
const NS_SESSION_BY_WORKSPACE: &str = "session:by-workspace";
const NS_WORKSPACE_BY_SESSION: &str = "session:reverse";
const NS_WORKSPACE: &str = "workspace:by-conversation";
const NS_MODEL: &str = "model:by-conversation";
const NS_MODEL_GLOBAL: &str = "model:global";
const GLOBAL_MODEL_KEY: &str = "default";

/// Session and preference mappings over a [`KvStore`].
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Build over the given backend.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Record a session id under both lookup keys plus the reverse map.
    pub async fn record_session(
        &self,
        conversation_id: &str,
        workspace: &Path,
        session_id: &str,
    ) -> StoreResult<()> {
        let ws = workspace.to_string_lossy();
        self.kv
            .set(
                NS_SESSION_BY_CONVERSATION,
                conversation_id,
                session_id.as_bytes().to_vec(),
            )
            .await?;
        self.kv
            .set(NS_SESSION_BY_WORKSPACE, &ws, session_id.as_bytes().to_vec())
            .await?;
        self.kv
            .set(NS_WORKSPACE_BY_SESSION, session_id, ws.as_bytes().to_vec())
            .await?;
        Ok(())
    }

    /// Session id last used by a conversation.
    pub async fn session_for_conversation(
        &self,
        conversation_id: &str,
    ) -> StoreResult<Option<String>> {
        self.get_string(NS_SESSION_BY_CONVERSATION, conversation_id)
            .await
    }

    /// Session id last used in a workspace.
    pub async fn session_for_workspace(&self, workspace: &Path) -> StoreResult<Option<String>> {
        self.get_string(NS_SESSION_BY_WORKSPACE, &workspace.to_string_lossy())
            .await
    }

    /// Workspace a session id was last seen in.
    pub async fn workspace_for_session(&self, session_id: &str) -> StoreResult<Option<PathBuf>> {
        Ok(self
            .get_string(NS_WORKSPACE_BY_SESSION, session_id)
            .await?
            .map(PathBuf::from))
    }

    /// Pin an explicit session id to a conversation (`/resume`).
    pub async fn pin_session(&self, conversation_id: &str, session_id: &str) -> StoreResult<()> {
        self.kv
            .set(
                NS_SESSION_BY_CONVERSATION,
                conversation_id,
                session_id.as_bytes().to_vec(),
            )
            .await
    }

    /// Drop the session binding for one conversation.
    pub async fn clear_conversation(&self, conversation_id: &str) -> StoreResult<()> {
        self.kv
            .delete(NS_SESSION_BY_CONVERSATION, conversation_id)
            .await?;
        Ok(())
    }

    /// Drop every session binding; returns how many entries were removed.
    pub async fn clear_all_sessions(&self) -> StoreResult<u64> {
        let mut removed = self.kv.clear_namespace(NS_SESSION_BY_CONVERSATION).await?;
        removed = removed.saturating_add(self.kv.clear_namespace(NS_SESSION_BY_WORKSPACE).await?);
        removed = removed.saturating_add(self.kv.clear_namespace(NS_WORKSPACE_BY_SESSION).await?);
        Ok(removed)
    }

    /// Workspace configured for a conversation.
    pub async fn workspace_for(&self, conversation_id: &str) -> StoreResult<Option<PathBuf>> {
        Ok(self
            .get_string(NS_WORKSPACE, conversation_id)
            .await?
            .map(PathBuf::from))
    }

    /// Set the workspace for a conversation (`/dir set`).
    pub async fn set_workspace(&self, conversation_id: &str, workspace: &Path) -> StoreResult<()> {
        self.kv
            .set(
                NS_WORKSPACE,
                conversation_id,
                workspace.to_string_lossy().as_bytes().to_vec(),
            )
            .await
    }

    /// Model override for a conversation, if any.
    pub async fn model_for(&self, conversation_id: &str) -> StoreResult<Option<String>> {
        self.get_string(NS_MODEL, conversation_id).await
    }

    /// Set a per-conversation model override (`/model set`).
    pub async fn set_model(&self, conversation_id: &str, model: &str) -> StoreResult<()> {
        self.kv
            .set(NS_MODEL, conversation_id, model.as_bytes().to_vec())
            .await
    }

    /// Gateway-wide model override, if any.
    pub async fn global_model(&self) -> StoreResult<Option<String>> {
        self.get_string(NS_MODEL_GLOBAL, GLOBAL_MODEL_KEY).await
    }

    /// Set the gateway-wide model override (`/model set --global`).
    pub async fn set_global_model(&self, model: &str) -> StoreResult<()> {
        self.kv
            .set(NS_MODEL_GLOBAL, GLOBAL_MODEL_KEY, model.as_bytes().to_vec())
            .await
    }

    async fn get_string(&self, namespace: &str, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .kv
            .get(namespace, key)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn record_session_updates_both_keys_and_reverse_map() {
        let sessions = store();
        let ws = Path::new("/work/proj");
        sessions
            .record_session("conv-1", ws, "sess-abc")
            .await
            .unwrap();

        assert_eq!(
            sessions.session_for_conversation("conv-1").await.unwrap(),
            Some("sess-abc".to_string())
        );
        assert_eq!(
            sessions.session_for_workspace(ws).await.unwrap(),
            Some("sess-abc".to_string())
        );
        assert_eq!(
            sessions.workspace_for_session("sess-abc").await.unwrap(),
            Some(PathBuf::from("/work/proj"))
        );
    }

    #[tokio::test]
    async fn newer_session_overwrites_older() {
        let sessions = store();
        let ws = Path::new("/work/proj");
        sessions.record_session("conv-1", ws, "old").await.unwrap();
        sessions.record_session("conv-1", ws, "new").await.unwrap();

        assert_eq!(
            sessions.session_for_conversation("conv-1").await.unwrap(),
            Some("new".to_string())
        );
        assert_eq!(
            sessions.session_for_workspace(ws).await.unwrap(),
            Some("new".to_string())
        );
    }

    #[tokio::test]
    async fn pin_session_only_touches_the_conversation_key() {
        let sessions = store();
        sessions.pin_session("conv-1", "sess-xyz").await.unwrap();

        assert_eq!(
            sessions.session_for_conversation("conv-1").await.unwrap(),
            Some("sess-xyz".to_string())
        );
        assert!(
            sessions
                .session_for_workspace(Path::new("/anywhere"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn clear_conversation_keeps_workspace_binding() {
        let sessions = store();
        let ws = Path::new("/work/proj");
        sessions.record_session("conv-1", ws, "sess").await.unwrap();
        sessions.clear_conversation("conv-1").await.unwrap();

        assert!(
            sessions
                .session_for_conversation("conv-1")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            sessions.session_for_workspace(ws).await.unwrap(),
            Some("sess".to_string())
        );
    }

    #[tokio::test]
    async fn clear_all_sessions_counts_every_binding() {
        let sessions = store();
        sessions
            .record_session("conv-1", Path::new("/a"), "s1")
            .await
            .unwrap();
        sessions
            .record_session("conv-2", Path::new("/b"), "s2")
            .await
            .unwrap();

        // Two conversations, two workspaces, two reverse entries.
        assert_eq!(sessions.clear_all_sessions().await.unwrap(), 6);
        assert!(
            sessions
                .session_for_conversation("conv-1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn workspace_and_model_preferences_round_trip() {
        let sessions = store();
        sessions
            .set_workspace("conv-1", Path::new("/work/app"))
            .await
            .unwrap();
        sessions.set_model("conv-1", "o4-mini").await.unwrap();
        sessions.set_global_model("gpt-5").await.unwrap();

        assert_eq!(
            sessions.workspace_for("conv-1").await.unwrap(),
            Some(PathBuf::from("/work/app"))
        );
        assert_eq!(
            sessions.model_for("conv-1").await.unwrap(),
            Some("o4-mini".to_string())
        );
        assert_eq!(
            sessions.global_model().await.unwrap(),
            Some("gpt-5".to_string())
        );
        assert!(sessions.model_for("conv-2").await.unwrap().is_none());
    }
}
