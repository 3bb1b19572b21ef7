//! Drives one agent invocation end to end.
//!
//! The runner resolves the backend and session, assembles the prompt, and
//! settles the outcome. Proposal output is parsed and weighed against the
//! command policy: blocked commands are refused, policy-clean command sets
//! auto-execute through a recursive execute run, and everything in between
//! asks the human.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};
use warden_core::{AgentBackendKind, AgentRequest, AgentResponse, RunMode};
use warden_policy::{CommandPolicy, PolicyEvaluator};
use warden_store::{AuditEvent, AuditStore};

use crate::backend::{AgentBackend, BackendRequest};
use crate::error::{AgentError, AgentResult};
use crate::prompt;
use crate::session::SessionRegistry;

/// Runner settings that do not belong to any single backend.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Backend used when a request carries no override.
    pub default_backend: AgentBackendKind,
    /// Default model, overridable per request.
    pub model: Option<String>,
    /// Preferred reply language embedded in prompts. Empty means no hint.
    pub language_hint: String,
}

/// Turns an [`AgentRequest`] into an [`AgentResponse`] through a backend.
pub struct AgentRunner {
    backends: HashMap<AgentBackendKind, Arc<dyn AgentBackend>>,
    evaluator: PolicyEvaluator,
    sessions: SessionRegistry,
    audit: AuditStore,
    config: RunnerConfig,
}

impl fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AgentRunner {
    /// Assemble a runner over the given backends.
    pub fn new(
        backends: Vec<Arc<dyn AgentBackend>>,
        evaluator: PolicyEvaluator,
        sessions: SessionRegistry,
        audit: AuditStore,
        config: RunnerConfig,
    ) -> Self {
        let backends = backends
            .into_iter()
            .map(|backend| (backend.kind(), backend))
            .collect();
        Self {
            backends,
            evaluator,
            sessions,
            audit,
            config,
        }
    }

    /// The policy evaluator applied to proposals.
    pub fn evaluator(&self) -> &PolicyEvaluator {
        &self.evaluator
    }

    /// The runner settings.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one invocation and settle its outcome.
    pub async fn run(
        &self,
        request: &AgentRequest,
        workspace: &Path,
        mode: RunMode,
    ) -> AgentResult<AgentResponse> {
        let kind = request
            .backend_override
            .unwrap_or(self.config.default_backend);
        let backend = self
            .backends
            .get(&kind)
            .ok_or_else(|| AgentError::Backend(format!("backend {kind} is not configured")))?;

        let resume = self
            .sessions
            .resume_id(&request.conversation_id, workspace)
            .await?;
        let prompt = match mode {
            RunMode::Proposal => prompt::proposal_prompt(
                &self.evaluator,
                &request.context,
                &request.user_text,
                &self.config.language_hint,
            ),
            RunMode::Execute => prompt::execute_prompt(
                &request.context,
                &request.user_text,
                &self.config.language_hint,
            ),
        };
        let backend_request = BackendRequest {
            conversation_id: request.conversation_id.clone(),
            prompt,
            workspace: workspace.to_path_buf(),
            mode,
            model: request
                .model_override
                .clone()
                .or_else(|| self.config.model.clone()),
            resume_session: resume,
        };

        info!(
            conversation_id = %request.conversation_id,
            backend = %kind,
            mode = ?mode,
            "invoking agent"
        );
        let output = backend.invoke(&backend_request).await?;
        self.record_audit(
            &request.conversation_id,
            AuditEvent::AgentInvoked {
                mode,
                backend: kind,
            },
        )
        .await;
        self.sessions
            .record(
                &request.conversation_id,
                workspace,
                output.session_id.as_deref(),
            )
            .await?;

        match mode {
            RunMode::Execute => Ok(AgentResponse::message(output.text)),
            RunMode::Proposal => self.settle_proposal(request, workspace, &output.text).await,
        }
    }

    /// Parse a proposal reply and decide what happens next.
    async fn settle_proposal(
        &self,
        request: &AgentRequest,
        workspace: &Path,
        raw: &str,
    ) -> AgentResult<AgentResponse> {
        let Some(proposal) = warden_proposal::parse(raw) else {
            debug!(
                conversation_id = %request.conversation_id,
                "agent output carried no envelope, relaying as-is"
            );
            return Ok(AgentResponse::Message {
                text: raw.trim().to_string(),
                auto_executed: false,
                unparsed: true,
            });
        };

        let policy = self.evaluator.evaluate(&proposal.commands, workspace);
        if policy.blocked {
            self.record_audit(
                &request.conversation_id,
                AuditEvent::CommandsBlocked {
                    commands: policy.blocked_commands.clone(),
                },
            )
            .await;
            return Ok(AgentResponse::message(blocked_report(&policy)));
        }

        // An explicit NEEDS_APPROVAL or any file change vetoes auto-execution
        // even when every command is allow-listed.
        let auto_allowed = policy.permits_auto_execute()
            && request.allow_auto_execute
            && !proposal.needs_approval
            && proposal.files.is_empty();
        let approval_required = !auto_allowed
            && (proposal.needs_approval || policy.needs_approval || !proposal.files.is_empty());
        if approval_required {
            return Ok(AgentResponse::NeedsApproval {
                text: proposal.response,
                approval_id: proposal.approval_id,
                summary: proposal.summary,
            });
        }

        if auto_allowed {
            debug!(
                conversation_id = %request.conversation_id,
                commands = proposal.commands.len(),
                "policy clears every proposed command, executing"
            );
            let executed = Box::pin(self.run(request, workspace, RunMode::Execute)).await?;
            return Ok(match executed {
                AgentResponse::Message { text, unparsed, .. } => AgentResponse::Message {
                    text,
                    auto_executed: true,
                    unparsed,
                },
                other => other,
            });
        }

        Ok(AgentResponse::message(proposal.response))
    }

    /// Audit writes never fail an invocation.
    async fn record_audit(&self, conversation_id: &str, event: AuditEvent) {
        if let Err(e) = self.audit.append(conversation_id, event).await {
            warn!(error = %e, "audit write failed");
        }
    }
}

/// User-facing report naming the commands policy refused.
fn blocked_report(policy: &CommandPolicy) -> String {
    let mut lines =
        vec!["I can't do this: the following commands are blocked by policy.".to_string()];
    for command in &policy.blocked_commands {
        lines.push(format!("- {command}"));
    }
    lines.push("Nothing was executed.".to_string());
    lines.join("\n")
}
