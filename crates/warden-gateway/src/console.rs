//! Line-oriented console transport.
//!
//! Reads stdin lines as private messages from a fixed chat id and prints
//! replies to stdout. This is the local operating mode; a real chat
//! transport replaces [`ConsoleSink`] and the read loop but reuses
//! everything behind [`ChatQueues`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use warden_core::{InboundMessage, MessageSink, SinkResult};
use warden_router::ChatQueues;

const CONSOLE_CHAT: &str = "console";
const CONSOLE_SENDER: &str = "operator";

/// Prints every outbound message to stdout.
pub(crate) struct ConsoleSink;

#[async_trait]
impl MessageSink for ConsoleSink {
    async fn send_message(&self, _chat_id: &str, text: &str) -> SinkResult<()> {
        println!("{text}");
        Ok(())
    }
}

/// Pump stdin lines through the queues until EOF or ctrl-c, then drain.
pub(crate) async fn run(queues: ChatQueues) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    info!("console ready; type a message or /help, ctrl-d to quit");
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                queues
                    .dispatch(InboundMessage::private(CONSOLE_CHAT, CONSOLE_SENDER, text))
                    .await;
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal");
                break;
            },
        }
    }

    // Let in-flight turns finish before the process exits.
    while !queues.idle().await {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Ok(())
}
