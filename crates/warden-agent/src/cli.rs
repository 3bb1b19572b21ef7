//! CLI subprocess backend.
//!
//! Each invocation spawns the configured agent binary once: prompt on stdin,
//! reply preferred from an output file the binary is asked to write, with
//! combined stdout and stderr as the fallback. Session continuity rides on a
//! `session id:` announcement scanned out of whatever the process emitted.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};
use warden_core::{AgentBackendKind, RunMode};

use crate::backend::{AgentBackend, BackendOutput, BackendRequest};
use crate::error::{AgentError, AgentResult};

/// Configuration for [`CliBackend`].
#[derive(Debug, Clone)]
pub struct CliBackendConfig {
    /// Path to the agent binary.
    pub binary: String,
    /// Seconds an invocation may run before the process is killed.
    pub timeout_secs: u64,
}

/// Runs the agent as a one-shot subprocess.
#[derive(Debug, Clone)]
pub struct CliBackend {
    config: CliBackendConfig,
}

impl CliBackend {
    /// Create a backend over the given binary.
    pub fn new(config: CliBackendConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AgentBackend for CliBackend {
    fn kind(&self) -> AgentBackendKind {
        AgentBackendKind::Cli
    }

    async fn invoke(&self, request: &BackendRequest) -> AgentResult<BackendOutput> {
        let capture = tempfile::Builder::new()
            .prefix("warden-agent-")
            .suffix(".out")
            .tempfile()?;

        let mut command = Command::new(&self.config.binary);
        command.arg("--cd").arg(&request.workspace);
        match request.mode {
            RunMode::Proposal => {
                command.arg("--sandbox").arg("read-only");
            },
            RunMode::Execute => {
                command.arg("--full-auto");
            },
        }
        command.arg("--output-file").arg(capture.path());
        if let Some(model) = &request.model {
            command.arg("--model").arg(model);
        }
        if let Some(session) = &request.resume_session {
            command.arg("--resume").arg(session);
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            binary = %self.config.binary,
            mode = ?request.mode,
            resume = request.resume_session.as_deref().unwrap_or("-"),
            "spawning agent process"
        );
        let mut child = command
            .spawn()
            .map_err(|e| AgentError::Spawn(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.prompt.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let deadline = Duration::from_secs(self.config.timeout_secs);
        let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(waited) => waited?,
            Err(_) => {
                // Dropping the timed-out future drops the child, and
                // kill_on_drop reaps it.
                return Err(AgentError::Timeout {
                    secs: self.config.timeout_secs,
                });
            },
        };

        let file_text = tokio::fs::read_to_string(capture.path())
            .await
            .unwrap_or_default();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let session_id = scan_session_id(&format!("{file_text}\n{stdout}\n{stderr}"));

        let text = if !file_text.trim().is_empty() {
            if !output.status.success() {
                warn!(status = %output.status, "agent exited non-zero but wrote its output file");
            }
            file_text
        } else if output.status.success() {
            format!("{stdout}\n{stderr}")
        } else {
            debug!(status = %output.status, stderr = %stderr, "agent failed without usable output");
            return Err(AgentError::EmptyOutput);
        };
        if text.trim().is_empty() {
            return Err(AgentError::EmptyOutput);
        }

        Ok(BackendOutput { text, session_id })
    }
}

/// Find a `session id:` or `session_id:` announcement in agent output.
///
/// Case-insensitive; the first match wins.
fn scan_session_id(raw: &str) -> Option<String> {
    let pattern = Regex::new(r"(?i)\bsession[ _]id:\s*([A-Za-z0-9._-]+)")
        .expect("session id pattern is a valid regex");
    pattern
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|found| found.as_str().to_string())
}
