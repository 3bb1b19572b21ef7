//! Warden gateway daemon (`wardend`).
//!
//! Loads the layered configuration, wires the policy engine, stores, agent
//! runner, and router together, and serves a message transport. The only
//! transport built in is the line-oriented console (`--console`); real chat
//! transports connect through the same [`warden_core::MessageSink`] seam.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warden_config::{Config, LogFormat};

mod bootstrap;
mod console;

/// Chat-driven gateway that routes messages into a coding agent with
/// human-in-the-loop approval.
#[derive(Parser)]
#[command(name = "wardend", version, about)]
struct Cli {
    /// Read exactly this config file instead of the layered lookup.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Workspace root; its `.warden/config.toml` joins the config layering
    /// and it becomes the default agent workspace. Defaults to the current
    /// directory.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Serve a line-oriented console on stdin/stdout.
    #[arg(long)]
    console: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let workspace = match cli.workspace {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving the current directory")?,
    };
    let config = match &cli.config {
        Some(path) => Config::load_file(path)
            .with_context(|| format!("loading config file {}", path.display()))?,
        None => Config::load(Some(&workspace), None).context("loading layered config")?,
    };

    init_tracing(&config);
    info!(
        backend = %config.agent.backend,
        workspace = %workspace.display(),
        "wardend starting"
    );

    if !cli.console {
        anyhow::bail!("no transport selected; run with --console");
    }

    let queues = bootstrap::build(&config, Arc::new(console::ConsoleSink), workspace)?;
    console::run(queues).await
}

/// Logs go to stderr so console replies own stdout.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
