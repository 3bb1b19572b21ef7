//! Conversation routing for the Warden gateway.
//!
//! The [`Router`] is the piece that turns raw chat messages into agent
//! work: it applies the pending-approval state machine, the slash-command
//! surface, mention filtering for groups, and the plugin conversation
//! flow, then relays agent responses back through the configured
//! [`MessageSink`](warden_core::MessageSink) in transport-sized chunks.
//!
//! [`ChatQueues`] sits in front of the router and serializes messages per
//! chat so agent invocations for one conversation never race on session
//! state. Different chats proceed concurrently.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::must_use_candidate)]

pub mod chunk;
pub mod commands;
pub mod error;
pub mod intent;
pub mod queue;
pub mod router;
pub mod state;

pub use chunk::chunk_text;
pub use commands::{CliAccess, CommandParse, SlashCommand};
pub use error::{RouterError, RouterResult};
pub use intent::ApprovalIntent;
pub use queue::{ChatHandler, ChatQueues};
pub use router::{Router, RouterConfig};
pub use state::{CODEX_PLUGIN, ConversationState, RouterState};
