//! Per-chat ordered dispatch.
//!
//! Messages for one chat are strictly serialized: the session-resume
//! mapping in the agent layer has no protection against two invocations
//! racing on the same workspace, so at most one message per chat is in
//! flight. Different chats run concurrently.
//!
//! One worker task exists per chat only while its queue is non-empty; the
//! worker exits when the queue drains and is respawned on the next
//! enqueue, so idle chats hold no tasks.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use warden_core::InboundMessage;

/// Processes one chat message to completion.
///
/// Implementations must be infallible at this boundary; whatever goes
/// wrong inside must already have been reported to the user.
#[async_trait]
pub trait ChatHandler: Send + Sync + 'static {
    /// Handle one inbound message.
    async fn handle(&self, message: InboundMessage);
}

struct Inner {
    queues: HashMap<String, VecDeque<InboundMessage>>,
    /// Chats that currently have a worker task.
    running: HashSet<String>,
}

/// FIFO queues keyed by chat id, one live worker per non-empty queue.
#[derive(Clone)]
pub struct ChatQueues {
    inner: Arc<Mutex<Inner>>,
    handler: Arc<dyn ChatHandler>,
}

impl ChatQueues {
    /// Build over the handler that will process every message.
    #[must_use]
    pub fn new(handler: Arc<dyn ChatHandler>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                queues: HashMap::new(),
                running: HashSet::new(),
            })),
            handler,
        }
    }

    /// Enqueue a message, spawning the chat's worker if none is live.
    pub async fn dispatch(&self, message: InboundMessage) {
        let chat_id = message.chat_id.clone();
        let spawn_worker = {
            let mut inner = self.inner.lock().await;
            inner
                .queues
                .entry(chat_id.clone())
                .or_default()
                .push_back(message);
            inner.running.insert(chat_id.clone())
        };

        if spawn_worker {
            debug!(chat_id = %chat_id, "spawning chat worker");
            let inner = Arc::clone(&self.inner);
            let handler = Arc::clone(&self.handler);
            tokio::spawn(run_chat(inner, handler, chat_id));
        }
    }

    /// True when every queue is empty and no worker is live.
    pub async fn idle(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.running.is_empty() && inner.queues.values().all(VecDeque::is_empty)
    }
}

/// Drains one chat's queue, then deregisters and exits.
async fn run_chat(inner: Arc<Mutex<Inner>>, handler: Arc<dyn ChatHandler>, chat_id: String) {
    loop {
        let next = {
            let mut guard = inner.lock().await;
            let item = guard
                .queues
                .get_mut(&chat_id)
                .and_then(VecDeque::pop_front);
            if item.is_none() {
                // Deregister under the same lock as the emptiness check so
                // a concurrent dispatch either sees us running or spawns a
                // replacement, never neither.
                guard.queues.remove(&chat_id);
                guard.running.remove(&chat_id);
            }
            item
        };

        let Some(message) = next else {
            debug!(chat_id = %chat_id, "chat queue drained, worker exiting");
            return;
        };
        handler.handle(message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Records (chat, text) pairs in completion order, with an optional
    /// delay to let queues build up.
    struct Recorder {
        log: StdMutex<Vec<(String, String)>>,
        delay: Duration,
    }

    impl Recorder {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                log: StdMutex::new(Vec::new()),
                delay,
            })
        }

        fn log(&self) -> Vec<(String, String)> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatHandler for Recorder {
        async fn handle(&self, message: InboundMessage) {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.log
                .lock()
                .unwrap()
                .push((message.chat_id, message.text));
        }
    }

    async fn wait_idle(queues: &ChatQueues) {
        for _ in 0..500 {
            if queues.idle().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("queues never drained");
    }

    #[tokio::test]
    async fn one_chat_is_strictly_ordered() {
        let recorder = Recorder::new(Duration::from_millis(5));
        let queues = ChatQueues::new(recorder.clone());

        for i in 0..5 {
            queues
                .dispatch(InboundMessage::private("chat-a", "u1", format!("m{i}")))
                .await;
        }
        wait_idle(&queues).await;

        let texts: Vec<String> = recorder.log().into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn chats_do_not_block_each_other() {
        let recorder = Recorder::new(Duration::from_millis(20));
        let queues = ChatQueues::new(recorder.clone());

        // Three messages for a busy chat, then one for another chat. The
        // second chat must not wait for the first chat's backlog.
        for i in 0..3 {
            queues
                .dispatch(InboundMessage::private("busy", "u1", format!("b{i}")))
                .await;
        }
        queues
            .dispatch(InboundMessage::private("quick", "u2", "q0"))
            .await;
        wait_idle(&queues).await;

        let log = recorder.log();
        let quick_pos = log.iter().position(|(c, _)| c == "quick").unwrap();
        let last_busy = log.iter().rposition(|(c, _)| c == "busy").unwrap();
        assert!(quick_pos < last_busy, "quick chat waited on busy backlog");

        // Per-chat order still holds for the busy chat.
        let busy: Vec<&str> = log
            .iter()
            .filter(|(c, _)| c == "busy")
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(busy, vec!["b0", "b1", "b2"]);
    }

    #[tokio::test]
    async fn worker_is_recreated_after_drain() {
        let recorder = Recorder::new(Duration::ZERO);
        let queues = ChatQueues::new(recorder.clone());

        queues
            .dispatch(InboundMessage::private("c", "u", "first"))
            .await;
        wait_idle(&queues).await;
        assert_eq!(recorder.log().len(), 1);

        queues
            .dispatch(InboundMessage::private("c", "u", "second"))
            .await;
        wait_idle(&queues).await;
        assert_eq!(recorder.log().len(), 2);
    }
}
