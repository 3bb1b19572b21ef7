//! Router-internal error type.
//!
//! Routing failures never reach the chat transport as error detail. The
//! router logs the full chain and sends a generic retry message instead.

use thiserror::Error;
use warden_agent::AgentError;
use warden_store::StoreError;

/// What can go wrong while routing one message.
#[derive(Debug, Error)]
pub enum RouterError {
    /// An agent invocation failed.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// A persistence operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
