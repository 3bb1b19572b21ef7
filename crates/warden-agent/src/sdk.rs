//! SDK thread backend.
//!
//! Talks to an agent service over HTTP. Each conversation maps to one
//! service-side thread: live handles are cached in memory, persisted session
//! ids let a thread survive gateway restarts, and any resume failure falls
//! back to a brand-new thread rather than failing the invocation.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Value, json};
use tracing::{debug, warn};
use warden_core::AgentBackendKind;

use crate::backend::{AgentBackend, BackendOutput, BackendRequest};
use crate::error::{AgentError, AgentResult};
use crate::extract;

/// Configuration for [`SdkBackend`].
#[derive(Clone)]
pub struct SdkBackendConfig {
    /// Base URL of the agent service, without a trailing slash.
    pub base_url: String,
    /// Bearer token for the service.
    pub api_key: String,
    /// Seconds a request may run before the HTTP client gives up.
    pub timeout_secs: u64,
}

impl fmt::Debug for SdkBackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkBackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Runs the agent through a remote thread API.
#[derive(Debug)]
pub struct SdkBackend {
    config: SdkBackendConfig,
    client: reqwest::Client,
    /// Live thread ids, keyed by conversation id.
    threads: DashMap<String, String>,
}

impl SdkBackend {
    /// Build a backend and its HTTP client.
    pub fn new(config: SdkBackendConfig) -> AgentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Backend(format!("http client: {e}")))?;
        Ok(Self {
            config,
            client,
            threads: DashMap::new(),
        })
    }

    /// The thread to try first: a live handle, else a persisted resume id.
    fn known_thread(&self, request: &BackendRequest) -> Option<String> {
        if let Some(live) = self.threads.get(&request.conversation_id) {
            return Some(live.value().clone());
        }
        request.resume_session.clone()
    }

    async fn create_thread(&self, request: &BackendRequest) -> AgentResult<String> {
        let body = json!({
            "workspace": request.workspace,
            "model": request.model,
        });
        let value = self
            .post(&format!("{}/threads", self.config.base_url), &body)
            .await?;
        thread_id_from(&value)
            .ok_or_else(|| AgentError::Backend("thread create response carried no id".into()))
    }

    async fn run_thread(&self, thread_id: &str, request: &BackendRequest) -> AgentResult<Value> {
        let body = json!({
            "input": request.prompt,
            "mode": request.mode,
            "workspace": request.workspace,
            "model": request.model,
        });
        self.post(
            &format!("{}/threads/{thread_id}/runs", self.config.base_url),
            &body,
        )
        .await
    }

    async fn post(&self, url: &str, body: &Value) -> AgentResult<Value> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::Backend(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::Backend(format!(
                "{url} returned {status}: {detail}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AgentError::Backend(format!("decoding {url}: {e}")))
    }

    /// Extract the reply, remember the live thread, and report the session.
    fn settle(
        &self,
        request: &BackendRequest,
        thread_id: String,
        value: &Value,
    ) -> AgentResult<BackendOutput> {
        let Some(text) = extract::extract_assistant_text(value) else {
            return Err(AgentError::EmptyOutput);
        };
        self.threads
            .insert(request.conversation_id.clone(), thread_id.clone());
        let session_id = value
            .get("session_id")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .or(Some(thread_id));
        Ok(BackendOutput { text, session_id })
    }
}

/// Read a thread id from a create response, tolerating either field name.
fn thread_id_from(value: &Value) -> Option<String> {
    for key in ["thread_id", "id"] {
        if let Some(id) = value.get(key).and_then(Value::as_str) {
            return Some(id.to_string());
        }
    }
    None
}

#[async_trait]
impl AgentBackend for SdkBackend {
    fn kind(&self) -> AgentBackendKind {
        AgentBackendKind::Sdk
    }

    async fn invoke(&self, request: &BackendRequest) -> AgentResult<BackendOutput> {
        if let Some(thread_id) = self.known_thread(request) {
            match self.run_thread(&thread_id, request).await {
                Ok(value) => return self.settle(request, thread_id, &value),
                Err(e) => {
                    // Resume failures fall back to a fresh thread; whatever
                    // the fresh thread hits propagates.
                    warn!(error = %e, thread_id = %thread_id, "thread resume failed, starting fresh");
                    self.threads.remove(&request.conversation_id);
                },
            }
        }
        let fresh = self.create_thread(request).await?;
        debug!(
            thread_id = %fresh,
            conversation_id = %request.conversation_id,
            "created agent thread"
        );
        let value = self.run_thread(&fresh, request).await?;
        self.settle(request, fresh, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use warden_core::RunMode;

    fn config() -> SdkBackendConfig {
        SdkBackendConfig {
            base_url: "https://agent.invalid/api".into(),
            api_key: "secret-key".into(),
            timeout_secs: 30,
        }
    }

    fn request(resume: Option<&str>) -> BackendRequest {
        BackendRequest {
            conversation_id: "chat-1".into(),
            prompt: "hello".into(),
            workspace: PathBuf::from("/work"),
            mode: RunMode::Proposal,
            model: None,
            resume_session: resume.map(ToString::to_string),
        }
    }

    #[test]
    fn debug_never_prints_the_api_key() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn live_thread_beats_persisted_resume_id() {
        let backend = SdkBackend::new(config()).unwrap();
        backend.threads.insert("chat-1".into(), "thread-live".into());
        assert_eq!(
            backend.known_thread(&request(Some("thread-old"))).as_deref(),
            Some("thread-live")
        );
    }

    #[test]
    fn persisted_resume_id_is_used_when_no_thread_is_live() {
        let backend = SdkBackend::new(config()).unwrap();
        assert_eq!(
            backend.known_thread(&request(Some("thread-old"))).as_deref(),
            Some("thread-old")
        );
        assert_eq!(backend.known_thread(&request(None)), None);
    }

    #[test]
    fn settle_caches_the_thread_and_prefers_explicit_session_id() {
        let backend = SdkBackend::new(config()).unwrap();
        let value = json!({"text": "answer", "session_id": "sess-77"});
        let output = backend
            .settle(&request(None), "thread-1".into(), &value)
            .unwrap();
        assert_eq!(output.text, "answer");
        assert_eq!(output.session_id.as_deref(), Some("sess-77"));
        assert_eq!(
            backend.threads.get("chat-1").map(|t| t.value().clone()),
            Some("thread-1".into())
        );

        let bare = json!({"text": "answer"});
        let output = backend
            .settle(&request(None), "thread-2".into(), &bare)
            .unwrap();
        assert_eq!(output.session_id.as_deref(), Some("thread-2"));
    }

    #[test]
    fn thread_id_tolerates_both_field_names() {
        assert_eq!(
            thread_id_from(&json!({"thread_id": "t-1"})).as_deref(),
            Some("t-1")
        );
        assert_eq!(thread_id_from(&json!({"id": "t-2"})).as_deref(), Some("t-2"));
        assert_eq!(thread_id_from(&json!({"name": "t-3"})), None);
    }
}
