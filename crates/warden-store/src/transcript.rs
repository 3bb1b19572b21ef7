//! Conversation transcript persistence.
//!
//! Turns are appended under monotonically increasing sequence keys;
//! [`TranscriptStore::recent`] returns the newest window in chronological
//! order for prompt context.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{ContextMessage, ContextRole};

use crate::error::StoreResult;
use crate::kv::KvStore;

fn transcript_ns(conversation_id: &str) -> String {
    format!("transcript:{conversation_id}")
}

/// One persisted conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptTurn {
    /// Who authored the turn.
    pub role: ContextRole,
    /// Turn text.
    pub content: String,
    /// When it was recorded.
    pub at: DateTime<Utc>,
}

impl From<TranscriptTurn> for ContextMessage {
    fn from(turn: TranscriptTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content,
        }
    }
}

/// Transcript windows over a [`KvStore`].
#[derive(Clone)]
pub struct TranscriptStore {
    kv: Arc<dyn KvStore>,
}

impl fmt::Debug for TranscriptStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptStore").finish_non_exhaustive()
    }
}

impl TranscriptStore {
    /// Build over the given backend.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Append one turn.
    ///
    /// The per-chat queue serializes turns for a conversation, so the
    /// read-modify-write on the sequence counter has a single writer.
    pub async fn append(
        &self,
        conversation_id: &str,
        role: ContextRole,
        content: &str,
    ) -> StoreResult<()> {
        let ns = transcript_ns(conversation_id);
        let seq = self.next_seq(&ns).await?;
        let turn = TranscriptTurn {
            role,
            content: content.to_string(),
            at: Utc::now(),
        };
        let bytes = serde_json::to_vec(&turn)?;
        self.kv.set(&ns, &format!("{seq:010}"), bytes).await
    }

    /// The newest `limit` turns, oldest first.
    pub async fn recent(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<TranscriptTurn>> {
        let ns = transcript_ns(conversation_id);
        let mut seqs: Vec<u64> = self
            .kv
            .list_keys(&ns)
            .await?
            .iter()
            .filter_map(|k| k.parse().ok())
            .collect();
        seqs.sort_unstable();

        let start = seqs.len().saturating_sub(limit);
        let mut turns = Vec::new();
        for seq in seqs.iter().skip(start) {
            if let Some(bytes) = self.kv.get(&ns, &format!("{seq:010}")).await? {
                turns.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(turns)
    }

    /// Drop the whole transcript for a conversation.
    pub async fn clear(&self, conversation_id: &str) -> StoreResult<u64> {
        self.kv
            .clear_namespace(&transcript_ns(conversation_id))
            .await
    }

    async fn next_seq(&self, ns: &str) -> StoreResult<u64> {
        let max = self
            .kv
            .list_keys(ns)
            .await?
            .iter()
            .filter_map(|k| k.parse::<u64>().ok())
            .max();
        Ok(max.map_or(0, |m| m.saturating_add(1)))
    }
}
