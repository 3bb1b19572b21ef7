//! Parser for the structured proposal envelope agents emit.
//!
//! In proposal mode the agent is instructed to answer with a labeled
//! envelope (`NEEDS_APPROVAL`, `SUMMARY`, `COMMANDS`, `FILES`, `RESPONSE`).
//! This crate recovers a [`ProposalResult`] from that free text. Parsing is
//! pure and side-effect free: identical input yields identical structure,
//! apart from the freshly minted approval id.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::must_use_candidate)]

pub mod envelope;

pub use envelope::{ProposalResult, parse};
