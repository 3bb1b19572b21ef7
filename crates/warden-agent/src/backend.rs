//! Backend abstraction.
//!
//! A backend is one concrete way of running the agent to completion. The
//! runner prepares everything that varies per call and hands it over as a
//! [`BackendRequest`]; the backend owns spawning, transport, and capture.

use std::path::PathBuf;

use async_trait::async_trait;
use warden_core::{AgentBackendKind, RunMode};

use crate::error::AgentResult;

/// One fully prepared invocation.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    /// Conversation the run belongs to.
    pub conversation_id: String,
    /// Assembled prompt, ready to feed to the agent.
    pub prompt: String,
    /// Directory the agent operates in.
    pub workspace: PathBuf,
    /// Proposal runs are read-only; execute runs may modify the workspace.
    pub mode: RunMode,
    /// Model to use, if the request or config picked one.
    pub model: Option<String>,
    /// Session to resume, when one is known for this chat or workspace.
    pub resume_session: Option<String>,
}

/// What a completed run hands back.
#[derive(Debug, Clone)]
pub struct BackendOutput {
    /// Raw agent output, still unparsed.
    pub text: String,
    /// Session id the run surfaced, if any.
    pub session_id: Option<String>,
}

/// A concrete way of running the agent.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Which backend this is, for dispatch and audit.
    fn kind(&self) -> AgentBackendKind;

    /// Drive one invocation to completion.
    async fn invoke(&self, request: &BackendRequest) -> AgentResult<BackendOutput>;
}
