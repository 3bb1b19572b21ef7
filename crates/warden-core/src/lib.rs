//! Core types and boundary traits for the Warden agent gateway.
//!
//! Everything the component crates exchange lives here:
//!
//! - [`InboundMessage`] — a chat message as delivered by the transport
//! - [`AgentRequest`] / [`AgentResponse`] — the Agent Runner contract
//! - [`MessageSink`] — the outbound send boundary
//! - [`ids`] — approval id generation
//!
//! This crate sits at the bottom of the workspace graph; every other crate
//! depends on it.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::must_use_candidate)]

pub mod ids;
pub mod message;
pub mod request;
pub mod response;
pub mod sink;

pub use ids::new_approval_id;
pub use message::InboundMessage;
pub use request::{AgentBackendKind, AgentRequest, ContextMessage, ContextRole, RunMode};
pub use response::AgentResponse;
pub use sink::{MessageSink, SinkError, SinkResult};
