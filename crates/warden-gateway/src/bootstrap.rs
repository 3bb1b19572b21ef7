//! Wires the configuration into a running gateway: storage, policy
//! evaluator, agent backends, runner, router, and the per-chat queues.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use warden_agent::{
    AgentBackend, AgentRunner, CliBackend, CliBackendConfig, RunnerConfig, SdkBackend,
    SdkBackendConfig, SessionRegistry,
};
use warden_config::{Config, StorageBackend};
use warden_core::MessageSink;
use warden_policy::{PolicyEvaluator, SafeRoots};
use warden_router::{ChatQueues, Router, RouterConfig};
use warden_store::{
    ApprovalStore, AuditStore, KvStore, MemoryKvStore, SessionStore, SurrealKvStore,
    TranscriptStore,
};

/// Build the full routing stack over the given outbound sink.
///
/// `workspace` is where agent turns run when a chat has not bound its own
/// directory with `/dir set`.
pub(crate) fn build(
    config: &Config,
    sink: Arc<dyn MessageSink>,
    workspace: PathBuf,
) -> anyhow::Result<ChatQueues> {
    let kv = open_store(config)?;
    let sessions = SessionStore::new(kv.clone());

    let evaluator = PolicyEvaluator::new(
        config.policy.variant,
        config.policy.pattern_sets(),
        SafeRoots::new(&config.policy.safe_roots),
    );

    let mut backends: Vec<Arc<dyn AgentBackend>> = vec![Arc::new(CliBackend::new(
        CliBackendConfig {
            binary: config.agent.binary.clone(),
            timeout_secs: config.agent.timeout_secs,
        },
    ))];
    if let Some(base_url) = &config.agent.base_url {
        let api_key = config
            .agent
            .api_key
            .clone()
            .context("agent.base_url is set but agent.api_key is not")?;
        backends.push(Arc::new(SdkBackend::new(SdkBackendConfig {
            base_url: base_url.clone(),
            api_key,
            timeout_secs: config.agent.timeout_secs,
        })?));
    }

    let runner = AgentRunner::new(
        backends,
        evaluator,
        SessionRegistry::new(sessions.clone()),
        AuditStore::new(kv.clone()),
        RunnerConfig {
            default_backend: config.agent.backend,
            model: config.agent.model.clone(),
            language_hint: config.gateway.language.clone(),
        },
    );

    let router = Arc::new(Router::new(
        runner,
        ApprovalStore::new(kv.clone()),
        sessions,
        TranscriptStore::new(kv.clone()),
        AuditStore::new(kv),
        sink,
        RouterConfig {
            context_turns: config.gateway.context_turns,
            chunk_limit: config.gateway.chunk_limit,
            default_workspace: workspace,
        },
    ));
    Ok(ChatQueues::new(router))
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn KvStore>> {
    Ok(match config.storage.backend {
        StorageBackend::Memory => {
            info!("using in-memory storage, state is lost on exit");
            Arc::new(MemoryKvStore::new())
        },
        StorageBackend::Kv => {
            let path = match &config.storage.path {
                Some(path) => path.clone(),
                None => default_data_dir()?,
            };
            std::fs::create_dir_all(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            info!(path = %path.display(), "opening kv store");
            Arc::new(SurrealKvStore::open(&path)?)
        },
    })
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".warden").join("data"))
        .context("cannot locate a home directory for the kv store")
}
