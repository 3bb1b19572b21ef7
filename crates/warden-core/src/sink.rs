//! Outbound message boundary.

use async_trait::async_trait;
use thiserror::Error;

/// Error sending a message through the transport.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The transport rejected or failed to deliver the message.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Result alias for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// The outbound send boundary.
///
/// At-least-once, best-effort: the router logs failures and never retries.
/// Implementations must be safe to call concurrently from multiple chat
/// workers.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver `text` to `chat_id`.
    async fn send_message(&self, chat_id: &str, text: &str) -> SinkResult<()>;
}

#[async_trait]
impl<T: MessageSink + ?Sized> MessageSink for std::sync::Arc<T> {
    async fn send_message(&self, chat_id: &str, text: &str) -> SinkResult<()> {
        (**self).send_message(chat_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<(String, String)>>);

    #[async_trait]
    impl MessageSink for Recorder {
        async fn send_message(&self, chat_id: &str, text: &str) -> SinkResult<()> {
            self.0
                .lock()
                .map_err(|e| SinkError::SendFailed(e.to_string()))?
                .push((chat_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn arc_impl_forwards() {
        let sink = Arc::new(Recorder(Mutex::new(Vec::new())));
        sink.send_message("c1", "hello").await.unwrap();
        let sent = sink.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "c1");
    }
}
