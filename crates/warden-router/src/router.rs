//! Message routing and the approval state machine.
//!
//! Per conversation the router is in `NO_PLUGIN` or `IN_PLUGIN(name)`,
//! with an orthogonal pending-approval flag that outranks everything else:
//! while an approval awaits an answer, every inbound message is read as a
//! reply to it. The remaining priority order is mention filtering, slash
//! commands, then the agent conversation flow.
//!
//! Errors from the agent and store layers stop at this boundary. The user
//! sees a generic retry message; the log carries the detail.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use warden_agent::AgentRunner;
use warden_core::{
    AgentBackendKind, AgentRequest, AgentResponse, ContextMessage, ContextRole, InboundMessage,
    MessageSink, RunMode,
};
use warden_policy::SafeRoots;
use warden_store::{
    ApprovalDecision, ApprovalPayload, ApprovalRecord, ApprovalStore, AuditEvent, AuditStore,
    PluginAction, SessionStore, StoreError, TranscriptStore,
};

use crate::chunk::chunk_text;
use crate::commands::{self, CliAccess, CommandParse, SlashCommand};
use crate::error::RouterResult;
use crate::intent::{self, ApprovalIntent};
use crate::queue::ChatHandler;
use crate::state::{CODEX_PLUGIN, RouterState};

/// Sent whenever routing fails internally. Deliberately free of detail.
const EXECUTION_FAILED: &str = "Execution failed, please retry.";

const HELP_TEXT: &str = "\
Commands:
/use <plugin> - enter a plugin (codex)
/exit - leave the plugin
/confirm [--last] - approve the pending action
/cancel - reject the pending action
/dir [set <path>] - show or change the workspace
/model [set [--global] <name>] - show or change the model
/resume <id> - pin an agent session to this chat
/cli [--write|--safe] - use the CLI backend, optionally setting access
/reset [--hard] - clear session state for this chat (or everywhere)
/plugin <enable|disable> <name> - toggle a plugin (needs confirmation)
/status - show routing state
/help - this list";

/// Router tunables.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Transcript turns carried into each proposal prompt.
    pub context_turns: usize,
    /// Outbound message chunk limit in bytes.
    pub chunk_limit: usize,
    /// Workspace used until a chat picks one with `/dir set`.
    pub default_workspace: PathBuf,
}

/// Routes inbound chat messages through commands, approvals, and the agent.
pub struct Router {
    runner: AgentRunner,
    approvals: ApprovalStore,
    sessions: SessionStore,
    transcripts: TranscriptStore,
    audit: AuditStore,
    state: RouterState,
    sink: Arc<dyn MessageSink>,
    config: RouterConfig,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Assemble a router over its collaborators.
    pub fn new(
        runner: AgentRunner,
        approvals: ApprovalStore,
        sessions: SessionStore,
        transcripts: TranscriptStore,
        audit: AuditStore,
        sink: Arc<dyn MessageSink>,
        config: RouterConfig,
    ) -> Self {
        Self {
            runner,
            approvals,
            sessions,
            transcripts,
            audit,
            state: RouterState::new(),
            sink,
            config,
        }
    }

    /// Route one message end to end.
    ///
    /// Infallible at this boundary: internal failures are logged in full
    /// and surface to the chat only as a generic retry message.
    pub async fn handle_message(&self, message: InboundMessage) {
        debug!(
            chat_id = %message.chat_id,
            is_group = message.is_group,
            "inbound message"
        );
        if let Err(e) = self.route(&message).await {
            error!(chat_id = %message.chat_id, error = %e, "routing failed");
            self.send(&message.chat_id, EXECUTION_FAILED).await;
        }
    }

    async fn route(&self, message: &InboundMessage) -> RouterResult<()> {
        let chat_id = &message.chat_id;

        if let Some(record) = self.approvals.pending_for(chat_id).await? {
            return self.route_pending(message, record).await;
        }
        if message.is_group && !message.mentioned {
            debug!(chat_id = %chat_id, "group message without mention, ignoring");
            return Ok(());
        }
        if let Some(parsed) = commands::parse(&message.text) {
            return self.dispatch_command(message, parsed).await;
        }
        match self.state.conversation(chat_id).plugin.as_deref() {
            None => {
                self.send(chat_id, "No plugin is active. Enter one with /use codex.")
                    .await;
                Ok(())
            },
            Some(CODEX_PLUGIN) => self.run_agent_turn(message).await,
            Some(other) => {
                self.send(
                    chat_id,
                    &format!(
                        "Plugin {other} cannot hold a conversation. Switch with /use codex."
                    ),
                )
                .await;
                Ok(())
            },
        }
    }

    /// Interpret a message as the answer to the pending approval.
    async fn route_pending(
        &self,
        message: &InboundMessage,
        record: ApprovalRecord,
    ) -> RouterResult<()> {
        let chat_id = &message.chat_id;

        // `/reset --hard` is the operator's recovery path and `/status`
        // a read-only probe; both must stay reachable while an approval
        // blocks normal routing.
        match commands::parse(&message.text) {
            Some(CommandParse::Ok(SlashCommand::Reset { hard: true })) => {
                if self
                    .resolve_record(chat_id, &record.id, ApprovalDecision::Rejected)
                    .await?
                {
                    self.send(chat_id, "Pending approval rejected.").await;
                }
                return self.handle_reset(chat_id, true).await;
            },
            Some(CommandParse::Ok(SlashCommand::Status)) => {
                let text = self.status_text(chat_id).await?;
                self.send(chat_id, &text).await;
                return Ok(());
            },
            _ => {},
        }

        match intent::classify(&message.text) {
            ApprovalIntent::Reject => {
                if self
                    .resolve_record(chat_id, &record.id, ApprovalDecision::Rejected)
                    .await?
                {
                    self.send(chat_id, "Cancelled. Nothing was executed.").await;
                }
                Ok(())
            },
            ApprovalIntent::ExitPlugin => {
                if self
                    .resolve_record(chat_id, &record.id, ApprovalDecision::Rejected)
                    .await?
                {
                    self.state.update(chat_id, |conv| conv.plugin = None);
                    self.send(chat_id, "Cancelled and left the plugin.").await;
                }
                Ok(())
            },
            ApprovalIntent::Accept => {
                if self
                    .resolve_record(chat_id, &record.id, ApprovalDecision::Approved)
                    .await?
                {
                    self.resume_approved(chat_id, &record).await?;
                }
                Ok(())
            },
            ApprovalIntent::Unclear => {
                self.send(
                    chat_id,
                    &format!(
                        "Still waiting on: {}\nReply /confirm to proceed or /cancel to drop it.",
                        record.summary
                    ),
                )
                .await;
                Ok(())
            },
        }
    }

    /// Move a record to its terminal status and audit the transition.
    ///
    /// Returns `false` (after telling the user) when the record was
    /// already resolved; real store failures propagate.
    async fn resolve_record(
        &self,
        chat_id: &str,
        approval_id: &str,
        decision: ApprovalDecision,
    ) -> RouterResult<bool> {
        match self.approvals.resolve(approval_id, decision).await {
            Ok(record) => {
                self.record_audit(
                    chat_id,
                    AuditEvent::ApprovalResolved {
                        approval_id: record.id.clone(),
                        status: record.status,
                    },
                )
                .await;
                Ok(true)
            },
            Err(StoreError::AlreadyResolved { status, .. }) => {
                self.send(chat_id, &format!("That request was already {status}."))
                    .await;
                Ok(false)
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Carry out what an approved record held back.
    async fn resume_approved(&self, chat_id: &str, record: &ApprovalRecord) -> RouterResult<()> {
        match &record.payload {
            ApprovalPayload::AgentExecute { request, workspace } => {
                info!(
                    chat_id = %chat_id,
                    approval_id = %record.id,
                    "replaying approved request in execute mode"
                );
                let response = self.runner.run(request, workspace, RunMode::Execute).await?;
                let text = response.text().trim();
                let reply = if text.is_empty() { "Done." } else { text };
                self.transcripts
                    .append(chat_id, ContextRole::Assistant, reply)
                    .await?;
                self.send_chunked(chat_id, reply).await;
                Ok(())
            },
            ApprovalPayload::PluginGovernance { plugin, action } => {
                let enabled = matches!(action, PluginAction::Enable);
                self.state.set_plugin_enabled(plugin, enabled);
                info!(plugin = %plugin, enabled, "plugin governance applied");
                let verb = if enabled { "enabled" } else { "disabled" };
                self.send(chat_id, &format!("Plugin {plugin} {verb}.")).await;
                Ok(())
            },
        }
    }

    async fn dispatch_command(
        &self,
        message: &InboundMessage,
        parsed: CommandParse,
    ) -> RouterResult<()> {
        let chat_id = &message.chat_id;
        let command = match parsed {
            CommandParse::Ok(command) => command,
            CommandParse::Usage(usage) => {
                self.send(chat_id, usage).await;
                return Ok(());
            },
            CommandParse::Unknown(word) => {
                self.send(
                    chat_id,
                    &format!("Unknown command {word}. Send /help for the list."),
                )
                .await;
                return Ok(());
            },
        };

        if requires_codex(&command) && !self.in_codex(chat_id) {
            self.send(
                chat_id,
                "This command needs the codex plugin. Enter it with /use codex.",
            )
            .await;
            return Ok(());
        }

        match command {
            SlashCommand::Confirm | SlashCommand::Cancel => {
                // A live pending approval is intercepted before command
                // dispatch, so reaching here means nothing is waiting.
                self.send(chat_id, "Nothing is waiting for confirmation.")
                    .await;
            },
            SlashCommand::Reset { hard } => return self.handle_reset(chat_id, hard).await,
            SlashCommand::Dir { set: None } => {
                let text = match self.sessions.workspace_for(chat_id).await? {
                    Some(ws) => format!("Workspace: {}", ws.display()),
                    None => format!(
                        "No workspace set; using {}. Change it with /dir set <path>.",
                        self.config.default_workspace.display()
                    ),
                };
                self.send(chat_id, &text).await;
            },
            SlashCommand::Dir { set: Some(path) } => {
                return self.set_workspace(chat_id, &path).await;
            },
            SlashCommand::Model { set: None, .. } => {
                let text = self.model_text(chat_id).await?;
                self.send(chat_id, &text).await;
            },
            SlashCommand::Model {
                set: Some(name),
                global,
            } => {
                if global {
                    self.sessions.set_global_model(&name).await?;
                    self.send(chat_id, &format!("Global model set to {name}."))
                        .await;
                } else {
                    self.sessions.set_model(chat_id, &name).await?;
                    self.send(chat_id, &format!("Model for this chat set to {name}."))
                        .await;
                }
            },
            SlashCommand::Resume { session_id } => {
                self.sessions.pin_session(chat_id, &session_id).await?;
                let mut reply = format!("Resuming session {session_id}.");
                if let Some(ws) = self.sessions.workspace_for_session(&session_id).await? {
                    self.sessions.set_workspace(chat_id, &ws).await?;
                    reply.push_str(&format!(" Workspace set to {}.", ws.display()));
                }
                self.send(chat_id, &reply).await;
            },
            SlashCommand::Cli { access } => {
                self.state.update(chat_id, |conv| {
                    conv.backend = Some(AgentBackendKind::Cli);
                    match access {
                        Some(CliAccess::Write) => conv.allow_auto_execute = true,
                        Some(CliAccess::Safe) => conv.allow_auto_execute = false,
                        None => {},
                    }
                });
                let mode = if self.state.conversation(chat_id).allow_auto_execute {
                    "write (policy-clean actions run unprompted)"
                } else {
                    "safe (every action needs /confirm)"
                };
                self.send(chat_id, &format!("CLI backend selected. Access: {mode}."))
                    .await;
            },
            SlashCommand::Use { plugin } => {
                if self.state.plugin_enabled(&plugin) {
                    self.state
                        .update(chat_id, |conv| conv.plugin = Some(plugin.clone()));
                    self.send(
                        chat_id,
                        &format!("Entered {plugin}. Describe what you want done, or /exit to leave."),
                    )
                    .await;
                } else {
                    self.send(
                        chat_id,
                        &format!("Plugin {plugin} is not available. Known plugins: codex."),
                    )
                    .await;
                }
            },
            SlashCommand::Exit => {
                let was_active = self.state.conversation(chat_id).plugin.is_some();
                self.state.update(chat_id, |conv| conv.plugin = None);
                let text = if was_active {
                    "Left the plugin."
                } else {
                    "No plugin is active."
                };
                self.send(chat_id, text).await;
            },
            SlashCommand::Plugin { enable, name } => {
                return self.request_plugin_change(chat_id, enable, name).await;
            },
            SlashCommand::Status => {
                let text = self.status_text(chat_id).await?;
                self.send(chat_id, &text).await;
            },
            SlashCommand::Help => self.send(chat_id, HELP_TEXT).await,
        }
        Ok(())
    }

    /// The codex conversation flow: validate, persist, propose, settle.
    async fn run_agent_turn(&self, message: &InboundMessage) -> RouterResult<()> {
        let chat_id = &message.chat_id;

        if !self.state.plugin_enabled(CODEX_PLUGIN) {
            self.state.update(chat_id, |conv| conv.plugin = None);
            self.send(
                chat_id,
                "The codex plugin is disabled. Re-enable it with /plugin enable codex.",
            )
            .await;
            return Ok(());
        }

        let workspace = self
            .sessions
            .workspace_for(chat_id)
            .await?
            .unwrap_or_else(|| self.config.default_workspace.clone());
        let roots = self.runner.evaluator().safe_roots();
        if !roots.roots().is_empty() && !roots.path_is_inside(&workspace) {
            warn!(
                chat_id = %chat_id,
                workspace = %workspace.display(),
                "workspace outside allowed roots"
            );
            self.send(chat_id, &outside_roots_message(&workspace, roots))
                .await;
            return Ok(());
        }

        let context: Vec<ContextMessage> = self
            .transcripts
            .recent(chat_id, self.config.context_turns)
            .await?
            .into_iter()
            .map(ContextMessage::from)
            .collect();
        self.transcripts
            .append(chat_id, ContextRole::User, &message.text)
            .await?;

        let model = match self.sessions.model_for(chat_id).await? {
            Some(model) => Some(model),
            None => self.sessions.global_model().await?,
        };
        let conv = self.state.conversation(chat_id);
        let mut request =
            AgentRequest::new(chat_id.clone(), message.text.clone()).with_context(context);
        if let Some(model) = model {
            request = request.with_model(model);
        }
        if let Some(backend) = conv.backend {
            request = request.with_backend(backend);
        }
        if !conv.allow_auto_execute {
            request = request.without_auto_execute();
        }

        let response = self
            .runner
            .run(&request, &workspace, RunMode::Proposal)
            .await?;
        self.deliver(chat_id, &request, &workspace, response).await
    }

    /// Settle one agent response toward the user.
    async fn deliver(
        &self,
        chat_id: &str,
        request: &AgentRequest,
        workspace: &Path,
        response: AgentResponse,
    ) -> RouterResult<()> {
        match response {
            AgentResponse::NeedsApproval { text, summary, .. } => {
                self.hold_for_approval(chat_id, request, workspace, &summary, &text)
                    .await
            },
            AgentResponse::Message {
                text,
                auto_executed,
                ..
            } => {
                // Some backend paths fold the structured envelope into what
                // arrives here as a plain message. Honor its approval ask.
                if let Some(proposal) = warden_proposal::parse(&text)
                    && proposal.needs_approval
                {
                    debug!(chat_id = %chat_id, "inline approval marker in plain message");
                    return self
                        .hold_for_approval(
                            chat_id,
                            request,
                            workspace,
                            &proposal.summary,
                            &proposal.response,
                        )
                        .await;
                }

                let reply = if text.trim().is_empty() {
                    "The agent returned no text."
                } else {
                    text.trim()
                };
                self.transcripts
                    .append(chat_id, ContextRole::Assistant, reply)
                    .await?;
                if auto_executed {
                    debug!(chat_id = %chat_id, "relaying auto-executed result");
                }
                self.send_chunked(chat_id, reply).await;
                Ok(())
            },
        }
    }

    /// Persist an approval record for the request and prompt the human.
    async fn hold_for_approval(
        &self,
        chat_id: &str,
        request: &AgentRequest,
        workspace: &Path,
        summary: &str,
        preface: &str,
    ) -> RouterResult<()> {
        let summary = match summary.trim() {
            "" => "the proposed action",
            s => s,
        };
        let payload = ApprovalPayload::AgentExecute {
            request: request.clone(),
            workspace: workspace.to_path_buf(),
        };
        let record = self.approvals.create(chat_id, summary, payload).await?;
        self.record_audit(
            chat_id,
            AuditEvent::ApprovalCreated {
                approval_id: record.id.clone(),
            },
        )
        .await;

        let mut text = String::new();
        let preface = preface.trim();
        if !preface.is_empty() {
            text.push_str(preface);
            text.push_str("\n\n");
        }
        text.push_str(&format!(
            "Approval needed: {summary}\nReply /confirm to proceed or /cancel to drop it."
        ));
        self.send_chunked(chat_id, &text).await;
        Ok(())
    }

    async fn request_plugin_change(
        &self,
        chat_id: &str,
        enable: bool,
        name: String,
    ) -> RouterResult<()> {
        let (action, verb) = if enable {
            (PluginAction::Enable, "enable")
        } else {
            (PluginAction::Disable, "disable")
        };
        let summary = format!("{verb} plugin {name}");
        let payload = ApprovalPayload::PluginGovernance {
            plugin: name,
            action,
        };
        let record = self.approvals.create(chat_id, &summary, payload).await?;
        self.record_audit(
            chat_id,
            AuditEvent::ApprovalCreated {
                approval_id: record.id.clone(),
            },
        )
        .await;
        self.send(
            chat_id,
            &format!("About to {summary}. Reply /confirm to apply or /cancel to keep things as they are."),
        )
        .await;
        Ok(())
    }

    async fn handle_reset(&self, chat_id: &str, hard: bool) -> RouterResult<()> {
        self.sessions.clear_conversation(chat_id).await?;
        self.transcripts.clear(chat_id).await?;
        if hard {
            let wiped = self.sessions.clear_all_sessions().await?;
            self.state.reset_conversation(chat_id);
            info!(chat_id = %chat_id, wiped, "hard reset");
            self.send(
                chat_id,
                "Hard reset done. Every stored session mapping was cleared.",
            )
            .await;
        } else {
            self.send(
                chat_id,
                "Session cleared for this chat. The next request starts fresh.",
            )
            .await;
        }
        Ok(())
    }

    async fn model_text(&self, chat_id: &str) -> RouterResult<String> {
        if let Some(model) = self.sessions.model_for(chat_id).await? {
            return Ok(format!("Model: {model} (set for this chat)"));
        }
        if let Some(model) = self.sessions.global_model().await? {
            return Ok(format!("Model: {model} (set globally)"));
        }
        Ok(match self.runner.config().model.clone() {
            Some(model) => format!("Model: {model} (configured default)"),
            None => "Model: backend default".to_string(),
        })
    }

    async fn status_text(&self, chat_id: &str) -> RouterResult<String> {
        let conv = self.state.conversation(chat_id);
        let workspace = match self.sessions.workspace_for(chat_id).await? {
            Some(ws) => ws.display().to_string(),
            None => format!("{} (default)", self.config.default_workspace.display()),
        };
        let session = self.sessions.session_for_conversation(chat_id).await?;
        let backend = conv
            .backend
            .unwrap_or(self.runner.config().default_backend);
        let audit_events = self.audit.for_conversation(chat_id).await?.len();
        let pending = match self.approvals.pending_for(chat_id).await? {
            Some(record) => record.summary,
            None => "none".to_string(),
        };

        Ok([
            format!("Plugin: {}", conv.plugin.as_deref().unwrap_or("none")),
            format!("Workspace: {workspace}"),
            format!("Backend: {backend}"),
            self.model_text(chat_id).await?,
            format!("Session: {}", session.as_deref().unwrap_or("none")),
            format!(
                "Auto-execute: {}",
                if conv.allow_auto_execute { "on" } else { "off" }
            ),
            format!("Pending approval: {pending}"),
            format!("Audit events: {audit_events}"),
        ]
        .join("\n"))
    }

    async fn set_workspace(&self, chat_id: &str, raw: &str) -> RouterResult<()> {
        let path = PathBuf::from(raw);
        if !path.is_absolute() {
            self.send(chat_id, "Workspace must be an absolute path.").await;
            return Ok(());
        }
        let roots = self.runner.evaluator().safe_roots();
        if !roots.roots().is_empty() && !roots.path_is_inside(&path) {
            self.send(chat_id, &outside_roots_message(&path, roots)).await;
            return Ok(());
        }
        if !path.is_dir() {
            self.send(
                chat_id,
                &format!("{} does not exist or is not a directory.", path.display()),
            )
            .await;
            return Ok(());
        }
        self.sessions.set_workspace(chat_id, &path).await?;
        self.send(chat_id, &format!("Workspace set to {}.", path.display()))
            .await;
        Ok(())
    }

    fn in_codex(&self, chat_id: &str) -> bool {
        self.state.conversation(chat_id).plugin.as_deref() == Some(CODEX_PLUGIN)
    }

    /// Send one message, logging failure. Delivery is best-effort and
    /// never retried.
    async fn send(&self, chat_id: &str, text: &str) {
        if let Err(e) = self.sink.send_message(chat_id, text).await {
            warn!(chat_id = %chat_id, error = %e, "outbound send failed");
        }
    }

    /// Send long text as limit-sized chunks at natural boundaries.
    async fn send_chunked(&self, chat_id: &str, text: &str) {
        for chunk in chunk_text(text, self.config.chunk_limit) {
            self.send(chat_id, &chunk).await;
        }
    }

    /// Audit writes never fail routing.
    async fn record_audit(&self, chat_id: &str, event: AuditEvent) {
        if let Err(e) = self.audit.append(chat_id, event).await {
            warn!(chat_id = %chat_id, error = %e, "audit write failed");
        }
    }
}

#[async_trait]
impl ChatHandler for Router {
    async fn handle(&self, message: InboundMessage) {
        self.handle_message(message).await;
    }
}

/// Commands that only make sense inside an active codex plugin context.
fn requires_codex(command: &SlashCommand) -> bool {
    matches!(
        command,
        SlashCommand::Dir { .. }
            | SlashCommand::Model { .. }
            | SlashCommand::Resume { .. }
            | SlashCommand::Cli { .. }
    )
}

/// Rejection naming the allowed roots and how to comply.
fn outside_roots_message(path: &Path, roots: &SafeRoots) -> String {
    let listed = roots
        .roots()
        .iter()
        .map(|root| format!("- {}", root.display()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{} is outside the allowed directories.\nAllowed:\n{listed}\nPoint /dir set <path> at a directory under one of these.",
        path.display()
    )
}
