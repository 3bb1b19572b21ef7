//! Persistence for the Warden gateway.
//!
//! Everything durable sits behind the byte-level [`KvStore`] trait: approval
//! records, session continuity maps, conversation transcripts, and the audit
//! log. [`MemoryKvStore`] backs tests and ephemeral deployments;
//! [`SurrealKvStore`] is the on-disk backend.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::must_use_candidate)]

pub mod approval;
pub mod audit;
pub mod error;
pub mod kv;
pub mod session;
pub mod transcript;

pub use approval::{
    ApprovalDecision, ApprovalPayload, ApprovalRecord, ApprovalStatus, ApprovalStore, PluginAction,
};
pub use audit::{AuditEntry, AuditEvent, AuditStore};
pub use error::{StoreError, StoreResult};
pub use kv::{KvStore, MemoryKvStore, SurrealKvStore};
pub use session::SessionStore;
pub use transcript::{TranscriptStore, TranscriptTurn};
