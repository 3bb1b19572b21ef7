//! Durable approval records.
//!
//! A record is created `pending`, transitions exactly once to `approved` or
//! `rejected`, and is never deleted afterwards. The "current" pending record
//! for a conversation is the most recently created one still pending.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use warden_core::AgentRequest;
use warden_core::ids::new_approval_id;

use crate::error::{StoreError, StoreResult};
use crate::kv::KvStore;

/// Namespace holding every approval record, keyed by approval id.
const NS_RECORDS: &str = "approval:records";

/// Per-conversation index namespace; keys are approval ids.
fn conversation_ns(conversation_id: &str) -> String {
    format!("approval:conversation:{conversation_id}")
}

/// Lifecycle state of an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Awaiting a human answer.
    Pending,
    /// Confirmed; the payload was replayed.
    Approved,
    /// Declined; the payload is never replayed.
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Terminal answer to a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// The human confirmed.
    Approved,
    /// The human declined.
    Rejected,
}

impl From<ApprovalDecision> for ApprovalStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => Self::Approved,
            ApprovalDecision::Rejected => Self::Rejected,
        }
    }
}

/// Governance action on a plugin, applied on confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginAction {
    /// Make the plugin available to conversations.
    Enable,
    /// Withdraw the plugin.
    Disable,
}

/// What confirming an approval resumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApprovalPayload {
    /// Replay the embedded request through the agent in execute mode.
    AgentExecute {
        /// The original request, replayed verbatim.
        request: AgentRequest,
        /// Workspace the request runs in.
        workspace: PathBuf,
    },
    /// Apply a plugin governance action directly; no agent involved.
    PluginGovernance {
        /// Plugin name.
        plugin: String,
        /// Enable or disable.
        action: PluginAction,
    },
}

/// A durable approval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Durable id the user answers to (`appr_<millis>_<random>`).
    pub id: String,
    /// Owning conversation.
    pub conversation_id: String,
    /// Current lifecycle state.
    pub status: ApprovalStatus,
    /// One-line description shown when prompting for confirmation.
    pub summary: String,
    /// Resumption data replayed on approval.
    pub payload: ApprovalPayload,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
}

/// Approval records over a [`KvStore`].
#[derive(Clone)]
pub struct ApprovalStore {
    kv: Arc<dyn KvStore>,
}

impl fmt::Debug for ApprovalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalStore").finish_non_exhaustive()
    }
}

impl ApprovalStore {
    /// Build over the given backend.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Create a pending record, minting the durable approval id.
    ///
    /// # Errors
    ///
    /// Fails when the record cannot be serialized or written.
    pub async fn create(
        &self,
        conversation_id: &str,
        summary: &str,
        payload: ApprovalPayload,
    ) -> StoreResult<ApprovalRecord> {
        let now = Utc::now();
        let record = ApprovalRecord {
            id: new_approval_id(),
            conversation_id: conversation_id.to_string(),
            status: ApprovalStatus::Pending,
            summary: summary.to_string(),
            payload,
            created_at: now,
            updated_at: now,
        };
        self.save(&record).await?;
        self.kv
            .set(&conversation_ns(conversation_id), &record.id, Vec::new())
            .await?;
        info!(approval_id = %record.id, conversation_id, "approval created");
        Ok(record)
    }

    /// Fetch a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no record exists under the id.
    pub async fn get(&self, id: &str) -> StoreResult<ApprovalRecord> {
        let bytes = self
            .kv
            .get(NS_RECORDS, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("approval {id}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// The most recently created record still pending for a conversation.
    pub async fn pending_for(&self, conversation_id: &str) -> StoreResult<Option<ApprovalRecord>> {
        let ids = self.kv.list_keys(&conversation_ns(conversation_id)).await?;
        let mut latest: Option<ApprovalRecord> = None;
        for id in ids {
            let record = match self.get(&id).await {
                Ok(record) => record,
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if record.status != ApprovalStatus::Pending {
                continue;
            }
            if latest
                .as_ref()
                .is_none_or(|cur| record.created_at >= cur.created_at)
            {
                latest = Some(record);
            }
        }
        Ok(latest)
    }

    /// Transition a pending record to its terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids and
    /// [`StoreError::AlreadyResolved`] when the record left `pending`
    /// earlier. Records are mutated exactly once.
    pub async fn resolve(
        &self,
        id: &str,
        decision: ApprovalDecision,
    ) -> StoreResult<ApprovalRecord> {
        let mut record = self.get(id).await?;
        if record.status != ApprovalStatus::Pending {
            return Err(StoreError::AlreadyResolved {
                id: id.to_string(),
                status: record.status.to_string(),
            });
        }
        record.status = decision.into();
        record.updated_at = Utc::now();
        self.save(&record).await?;
        info!(approval_id = %record.id, status = %record.status, "approval resolved");
        Ok(record)
    }

    async fn save(&self, record: &ApprovalRecord) -> StoreResult<()> {
        let bytes = serde_json::to_vec(record)?;
        self.kv.set(NS_RECORDS, &record.id, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::kv::MemoryKvStore;

    fn store() -> ApprovalStore {
        ApprovalStore::new(Arc::new(MemoryKvStore::new()))
    }

    fn execute_payload(text: &str) -> ApprovalPayload {
        ApprovalPayload::AgentExecute {
            request: AgentRequest::new("conv-1", text),
            workspace: PathBuf::from("/work/proj"),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let approvals = store();
        let created = approvals
            .create("conv-1", "delete two files", execute_payload("clean up"))
            .await
            .unwrap();

        assert!(created.id.starts_with("appr_"));
        assert_eq!(created.status, ApprovalStatus::Pending);

        let loaded = approvals.get(&created.id).await.unwrap();
        assert_eq!(loaded.conversation_id, "conv-1");
        assert_eq!(loaded.summary, "delete two files");
        match loaded.payload {
            ApprovalPayload::AgentExecute { request, workspace } => {
                assert_eq!(request.user_text, "clean up");
                assert_eq!(workspace, PathBuf::from("/work/proj"));
            },
            ApprovalPayload::PluginGovernance { .. } => panic!("wrong payload kind"),
        }
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let approvals = store();
        assert!(matches!(
            approvals.get("appr_0_missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn pending_for_returns_most_recent_pending() {
        let approvals = store();
        let first = approvals
            .create("conv-1", "first", execute_payload("a"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = approvals
            .create("conv-1", "second", execute_payload("b"))
            .await
            .unwrap();

        let pending = approvals.pending_for("conv-1").await.unwrap().unwrap();
        assert_eq!(pending.id, second.id);

        approvals
            .resolve(&second.id, ApprovalDecision::Rejected)
            .await
            .unwrap();
        let pending = approvals.pending_for("conv-1").await.unwrap().unwrap();
        assert_eq!(pending.id, first.id);
    }

    #[tokio::test]
    async fn pending_for_ignores_other_conversations() {
        let approvals = store();
        approvals
            .create("conv-a", "theirs", execute_payload("x"))
            .await
            .unwrap();
        assert!(approvals.pending_for("conv-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolve_is_single_shot() {
        let approvals = store();
        let record = approvals
            .create("conv-1", "once", execute_payload("x"))
            .await
            .unwrap();

        let approved = approvals
            .resolve(&record.id, ApprovalDecision::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);

        let err = approvals
            .resolve(&record.id, ApprovalDecision::Rejected)
            .await
            .unwrap_err();
        match err {
            StoreError::AlreadyResolved { id, status } => {
                assert_eq!(id, record.id);
                assert_eq!(status, "approved");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn resolved_records_are_kept() {
        let approvals = store();
        let record = approvals
            .create("conv-1", "kept", execute_payload("x"))
            .await
            .unwrap();
        approvals
            .resolve(&record.id, ApprovalDecision::Rejected)
            .await
            .unwrap();

        let loaded = approvals.get(&record.id).await.unwrap();
        assert_eq!(loaded.status, ApprovalStatus::Rejected);
        assert!(loaded.updated_at >= loaded.created_at);
    }

    #[tokio::test]
    async fn plugin_payload_round_trips() {
        let approvals = store();
        let record = approvals
            .create(
                "conv-1",
                "enable codex",
                ApprovalPayload::PluginGovernance {
                    plugin: "codex".to_string(),
                    action: PluginAction::Enable,
                },
            )
            .await
            .unwrap();

        let loaded = approvals.get(&record.id).await.unwrap();
        match loaded.payload {
            ApprovalPayload::PluginGovernance { plugin, action } => {
                assert_eq!(plugin, "codex");
                assert_eq!(action, PluginAction::Enable);
            },
            ApprovalPayload::AgentExecute { .. } => panic!("wrong payload kind"),
        }
    }
}
