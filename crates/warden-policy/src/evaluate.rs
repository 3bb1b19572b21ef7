//! Policy evaluation for proposed shell commands.
//!
//! A batch of commands gets a single [`CommandPolicy`] verdict. Blocking is
//! computed the same way under every variant; what distinguishes variants is
//! how approval and auto-execution are decided.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matcher::{compile_patterns, matches_any};
use crate::paths::SafeRoots;
use crate::shell::extract_deletion_targets;

/// Which rule family decides approval and auto-execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyVariant {
    /// Block, confirm and allow pattern lists decide everything.
    #[default]
    PatternTriad,
    /// Deletions targeting paths outside the safe roots require approval;
    /// anything else that is not blocked runs unattended.
    SafeRoots,
}

/// The three pattern lists a [`PolicyEvaluator`] is configured with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSets {
    /// Commands matching any of these are never executed.
    pub block: Vec<String>,
    /// Commands matching any of these always require human approval.
    pub confirm: Vec<String>,
    /// Under [`PolicyVariant::PatternTriad`], every command must match one
    /// of these for the batch to auto-execute.
    pub allow: Vec<String>,
}

/// Verdict for one batch of proposed commands.
///
/// All flags are filled in even when the batch is blocked, so callers can
/// report the complete picture. Use [`CommandPolicy::permits_auto_execute`]
/// to decide whether to actually run anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPolicy {
    /// At least one command matched a block pattern.
    pub blocked: bool,
    /// The commands that matched block patterns.
    pub blocked_commands: Vec<String>,
    /// At least one command requires a human in the loop.
    pub needs_approval: bool,
    /// The batch qualifies for unattended execution.
    pub auto_execute: bool,
}

impl CommandPolicy {
    /// Whether execution may proceed without approval. A blocked batch
    /// never auto-executes, whatever the other flags say.
    #[must_use]
    pub fn permits_auto_execute(&self) -> bool {
        self.auto_execute && !self.blocked
    }
}

/// Evaluates proposed commands against the configured policy.
///
/// Holds only the raw configuration; patterns are compiled fresh for each
/// evaluation and shared across the commands in that batch.
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    variant: PolicyVariant,
    patterns: PatternSets,
    safe_roots: SafeRoots,
}

impl PolicyEvaluator {
    /// Build an evaluator over the configured pattern lists and roots.
    #[must_use]
    pub fn new(variant: PolicyVariant, patterns: PatternSets, safe_roots: SafeRoots) -> Self {
        Self {
            variant,
            patterns,
            safe_roots,
        }
    }

    /// The active variant.
    #[must_use]
    pub fn variant(&self) -> PolicyVariant {
        self.variant
    }

    /// The raw configured pattern lists.
    #[must_use]
    pub fn patterns(&self) -> &PatternSets {
        &self.patterns
    }

    /// The configured safe roots.
    #[must_use]
    pub fn safe_roots(&self) -> &SafeRoots {
        &self.safe_roots
    }

    /// Evaluate a batch of proposed commands against the policy.
    ///
    /// Evaluation is a pure function of the inputs: the same commands and
    /// workspace always yield the same verdict.
    #[must_use]
    pub fn evaluate(&self, commands: &[String], workspace: &Path) -> CommandPolicy {
        let block = compile_patterns(&self.patterns.block);
        let blocked_commands: Vec<String> = commands
            .iter()
            .filter(|cmd| matches_any(cmd, &block))
            .cloned()
            .collect();
        let blocked = !blocked_commands.is_empty();
        if blocked {
            debug!(
                count = blocked_commands.len(),
                "proposed commands matched block patterns"
            );
        }

        let (needs_approval, auto_execute) = match self.variant {
            PolicyVariant::PatternTriad => {
                let confirm = compile_patterns(&self.patterns.confirm);
                let allow = compile_patterns(&self.patterns.allow);
                let needs = commands.iter().any(|cmd| matches_any(cmd, &confirm));
                let auto = !commands.is_empty()
                    && !needs
                    && commands.iter().all(|cmd| matches_any(cmd, &allow));
                (needs, auto)
            },
            PolicyVariant::SafeRoots => {
                let needs = commands.iter().any(|cmd| {
                    extract_deletion_targets(cmd)
                        .iter()
                        .any(|target| !self.safe_roots.target_is_inside(target, workspace))
                });
                let auto = !commands.is_empty() && !needs;
                (needs, auto)
            },
        };

        CommandPolicy {
            blocked,
            blocked_commands,
            needs_approval,
            auto_execute,
        }
    }
}
