//! Invocation error taxonomy.
//!
//! Policy refusals and unparseable envelopes are outcomes, not errors; they
//! surface as [`AgentResponse`](warden_core::AgentResponse) values. Errors
//! here mean the invocation itself broke.

use thiserror::Error;
use warden_store::StoreError;

/// Failure of an agent invocation.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent binary could not be started.
    #[error("failed to spawn agent process: {0}")]
    Spawn(String),

    /// The invocation outran its deadline and the process was killed.
    #[error("agent timed out after {secs}s")]
    Timeout {
        /// Configured deadline in seconds.
        secs: u64,
    },

    /// The run finished without producing usable output.
    #[error("agent produced no usable output")]
    EmptyOutput,

    /// The SDK backend or its HTTP transport failed.
    #[error("agent backend error: {0}")]
    Backend(String),

    /// Session or audit persistence failed around the run.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Pipe or filesystem failure while driving the process.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Shorthand result for invocation paths.
pub type AgentResult<T> = Result<T, AgentError>;
