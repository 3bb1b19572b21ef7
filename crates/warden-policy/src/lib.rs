//! Command policy engine for the Warden agent gateway.
//!
//! Classifies shell commands proposed by the coding agent into blocked,
//! needs-confirmation, and auto-executable, before anything runs:
//!
//! - [`matcher`] — compiles user-supplied pattern strings (`/regex/flags` or
//!   literal word matches) into predicates
//! - [`shell`] — POSIX-like tokenization and deletion-target extraction
//! - [`paths`] — safe-root membership checks with `~` and workspace-relative
//!   resolution
//! - [`evaluate`] — the policy evaluator combining all of the above
//!
//! The engine is heuristic and pattern-based; it makes no attempt to
//! formally verify shell-command safety.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::must_use_candidate)]

pub mod evaluate;
pub mod matcher;
pub mod paths;
pub mod shell;

pub use evaluate::{CommandPolicy, PatternSets, PolicyEvaluator, PolicyVariant};
pub use matcher::{CompiledPattern, compile_patterns, matches_any};
pub use paths::SafeRoots;
pub use shell::{extract_deletion_targets, split_statements, tokenize};
