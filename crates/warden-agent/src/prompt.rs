//! Prompt assembly.
//!
//! Proposal prompts restate the command policy in natural language and ask
//! for the structured envelope; execute prompts authorize the approved
//! action and ask for a plain report. Both embed the conversation context
//! oldest first.

use warden_core::{ContextMessage, ContextRole};
use warden_policy::{PolicyEvaluator, PolicyVariant};

const ENVELOPE_INSTRUCTIONS: &str = "\
Answer with exactly this structure:

NEEDS_APPROVAL: yes or no
SUMMARY: one line describing the proposed actions
COMMANDS:
- one shell command per line, or the word none
FILES:
- one file you would create or modify per line, or the word none
RESPONSE:
What you would tell the user, in plain language.";

/// Build the prompt for a read-only proposal run.
pub fn proposal_prompt(
    evaluator: &PolicyEvaluator,
    context: &[ContextMessage],
    user_text: &str,
    language_hint: &str,
) -> String {
    let mut sections = vec![
        "You are a coding agent reviewing a request. Work out what it would \
         take, but do not run commands or modify files in this pass."
            .to_string(),
        policy_section(evaluator),
        ENVELOPE_INSTRUCTIONS.to_string(),
    ];
    if !context.is_empty() {
        sections.push(context_section(context));
    }
    if !language_hint.is_empty() {
        sections.push(format!("Reply in {language_hint}."));
    }
    sections.push(format!("User request:\n{user_text}"));
    sections.join("\n\n")
}

/// Build the prompt for an approved execute run.
pub fn execute_prompt(context: &[ContextMessage], user_text: &str, language_hint: &str) -> String {
    let mut sections = vec![
        "The user has approved this request. You are authorized to carry it \
         out now, including running commands and modifying files. Reply with \
         a short report of what you did, in plain language with no structured \
         sections."
            .to_string(),
    ];
    if !context.is_empty() {
        sections.push(context_section(context));
    }
    if !language_hint.is_empty() {
        sections.push(format!("Reply in {language_hint}."));
    }
    sections.push(format!("Approved request:\n{user_text}"));
    sections.join("\n\n")
}

fn policy_section(evaluator: &PolicyEvaluator) -> String {
    match evaluator.variant() {
        PolicyVariant::PatternTriad => {
            let patterns = evaluator.patterns();
            format!(
                "Command policy:\n\
                 - Forbidden, never propose for execution: {}\n\
                 - Requires human confirmation: {}\n\
                 - May run without confirmation: {}",
                pattern_list(&patterns.block),
                pattern_list(&patterns.confirm),
                pattern_list(&patterns.allow),
            )
        },
        PolicyVariant::SafeRoots => {
            let roots: Vec<String> = evaluator
                .safe_roots()
                .roots()
                .iter()
                .map(|root| root.display().to_string())
                .collect();
            let listed = if roots.is_empty() {
                "(none configured)".to_string()
            } else {
                roots.join(", ")
            };
            format!(
                "Command policy: any file deletion outside these directories \
                 requires human confirmation: {listed}"
            )
        },
    }
}

fn pattern_list(patterns: &[String]) -> String {
    if patterns.is_empty() {
        "(none)".to_string()
    } else {
        patterns.join(", ")
    }
}

fn context_section(context: &[ContextMessage]) -> String {
    let mut lines = vec!["Conversation so far, oldest first:".to_string()];
    for message in context {
        let role = match &message.role {
            ContextRole::User => "user",
            ContextRole::Assistant => "assistant",
        };
        lines.push(format!("{role}: {}", message.content));
    }
    lines.join("\n")
}
