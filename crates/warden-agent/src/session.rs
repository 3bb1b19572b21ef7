//! Session continuity around invocations.

use std::path::Path;

use warden_store::SessionStore;

use crate::error::AgentResult;

/// Resolves which session a run should resume and records fresh ids.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    store: SessionStore,
}

impl SessionRegistry {
    /// Wrap the persistent session store.
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// The session id an invocation should resume, if any.
    ///
    /// The conversation binding wins over the workspace binding, so a chat
    /// that was explicitly pinned keeps its session even after another chat
    /// touches the same directory.
    pub async fn resume_id(
        &self,
        conversation_id: &str,
        workspace: &Path,
    ) -> AgentResult<Option<String>> {
        if let Some(id) = self.store.session_for_conversation(conversation_id).await? {
            return Ok(Some(id));
        }
        Ok(self.store.session_for_workspace(workspace).await?)
    }

    /// Record a session id the run surfaced.
    ///
    /// A run that surfaced no id leaves the existing bindings untouched, so
    /// continuity carries forward from the last announcement.
    pub async fn record(
        &self,
        conversation_id: &str,
        workspace: &Path,
        discovered: Option<&str>,
    ) -> AgentResult<()> {
        if let Some(id) = discovered {
            self.store
                .record_session(conversation_id, workspace, id)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use warden_store::{KvStore, MemoryKvStore};

    fn registry() -> (SessionRegistry, SessionStore) {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let store = SessionStore::new(kv);
        (SessionRegistry::new(store.clone()), store)
    }

    #[tokio::test]
    async fn conversation_binding_wins_over_workspace_binding() {
        let (registry, store) = registry();
        let workspace = PathBuf::from("/work/proj");
        store
            .record_session("other-chat", &workspace, "sess-workspace")
            .await
            .unwrap();
        store.pin_session("chat-1", "sess-pinned").await.unwrap();

        let resumed = registry.resume_id("chat-1", &workspace).await.unwrap();
        assert_eq!(resumed.as_deref(), Some("sess-pinned"));
    }

    #[tokio::test]
    async fn workspace_binding_is_the_fallback() {
        let (registry, store) = registry();
        let workspace = PathBuf::from("/work/proj");
        store
            .record_session("other-chat", &workspace, "sess-workspace")
            .await
            .unwrap();

        let resumed = registry.resume_id("chat-1", &workspace).await.unwrap();
        assert_eq!(resumed.as_deref(), Some("sess-workspace"));
        let cold = registry
            .resume_id("chat-1", &PathBuf::from("/elsewhere"))
            .await
            .unwrap();
        assert_eq!(cold, None);
    }

    #[tokio::test]
    async fn record_writes_both_bindings() {
        let (registry, store) = registry();
        let workspace = PathBuf::from("/work/proj");
        registry
            .record("chat-1", &workspace, Some("sess-new"))
            .await
            .unwrap();

        assert_eq!(
            store.session_for_conversation("chat-1").await.unwrap(),
            Some("sess-new".into())
        );
        assert_eq!(
            store.session_for_workspace(&workspace).await.unwrap(),
            Some("sess-new".into())
        );
        assert_eq!(
            store.workspace_for_session("sess-new").await.unwrap(),
            Some(workspace)
        );
    }

    #[tokio::test]
    async fn absent_discovery_leaves_bindings_alone() {
        let (registry, store) = registry();
        let workspace = PathBuf::from("/work/proj");
        store
            .record_session("chat-1", &workspace, "sess-old")
            .await
            .unwrap();

        registry.record("chat-1", &workspace, None).await.unwrap();
        assert_eq!(
            store.session_for_conversation("chat-1").await.unwrap(),
            Some("sess-old".into())
        );
    }
}
