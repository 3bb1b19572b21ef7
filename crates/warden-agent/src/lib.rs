//! Agent invocation for the Warden gateway.
//!
//! This crate turns an [`AgentRequest`](warden_core::AgentRequest) into an
//! [`AgentResponse`](warden_core::AgentResponse): it assembles the prompt,
//! drives one of the configured backends, threads session continuity through
//! the store, and settles proposal envelopes against the command policy.
//!
//! Two backends exist. [`CliBackend`] spawns the agent binary once per
//! invocation and captures its output; [`SdkBackend`] holds conversational
//! threads open against an HTTP agent service. Both sit behind the
//! [`AgentBackend`] trait so the runner and the router never care which one
//! is doing the work.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod cli;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod runner;
pub mod sdk;
pub mod session;

pub use backend::{AgentBackend, BackendOutput, BackendRequest};
pub use cli::{CliBackend, CliBackendConfig};
pub use error::{AgentError, AgentResult};
pub use runner::{AgentRunner, RunnerConfig};
pub use sdk::{SdkBackend, SdkBackendConfig};
pub use session::SessionRegistry;
