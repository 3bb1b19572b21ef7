//! Append-only audit log.
//!
//! Records approval lifecycle events, blocked commands, and agent
//! invocations. Entries are immutable; there is no delete path.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::{AgentBackendKind, RunMode};

use crate::approval::ApprovalStatus;
use crate::error::StoreResult;
use crate::kv::KvStore;

/// Namespace holding every entry, keyed by entry id.
const NS_ENTRIES: &str = "audit:entries";

/// Per-conversation index namespace; keys are entry ids.
fn conversation_ns(conversation_id: &str) -> String {
    format!("audit:conversation:{conversation_id}")
}

/// What happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// An approval record was created.
    ApprovalCreated {
        /// Record id.
        approval_id: String,
    },
    /// An approval reached its terminal status.
    ApprovalResolved {
        /// Record id.
        approval_id: String,
        /// Terminal status.
        status: ApprovalStatus,
    },
    /// Proposed commands hit the block list.
    CommandsBlocked {
        /// The offending commands, verbatim.
        commands: Vec<String>,
    },
    /// The agent was invoked.
    AgentInvoked {
        /// Proposal or execute.
        mode: RunMode,
        /// The backend that ran it.
        backend: AgentBackendKind,
    },
}

/// One immutable audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry id.
    pub id: Uuid,
    /// Conversation the event belongs to.
    pub conversation_id: String,
    /// The recorded event.
    pub event: AuditEvent,
    /// When it was recorded.
    pub at: DateTime<Utc>,
}

/// Audit entries over a [`KvStore`].
#[derive(Clone)]
pub struct AuditStore {
    kv: Arc<dyn KvStore>,
}

impl fmt::Debug for AuditStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditStore").finish_non_exhaustive()
    }
}

impl AuditStore {
    /// Build over the given backend.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Append an entry.
    ///
    /// Auditing is best-effort at call sites: callers log a failure and
    /// carry on rather than failing the user-facing flow.
    pub async fn append(
        &self,
        conversation_id: &str,
        event: AuditEvent,
    ) -> StoreResult<AuditEntry> {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.to_string(),
            event,
            at: Utc::now(),
        };
        let bytes = serde_json::to_vec(&entry)?;
        let key = entry.id.to_string();
        self.kv.set(NS_ENTRIES, &key, bytes).await?;
        self.kv
            .set(&conversation_ns(conversation_id), &key, Vec::new())
            .await?;
        Ok(entry)
    }

    /// Entries for a conversation, oldest first.
    pub async fn for_conversation(&self, conversation_id: &str) -> StoreResult<Vec<AuditEntry>> {
        let keys = self.kv.list_keys(&conversation_ns(conversation_id)).await?;
        let mut entries: Vec<AuditEntry> = Vec::new();
        for key in keys {
            if let Some(bytes) = self.kv.get(NS_ENTRIES, &key).await? {
                entries.push(serde_json::from_slice(&bytes)?);
            }
        }
        entries.sort_by_key(|e| e.at);
        Ok(entries)
    }
}
