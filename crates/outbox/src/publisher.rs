//! Event broker abstraction and an in-process implementation.

use std::sync::Arc;

use async_trait::async_trait;
use store::StagedEvent;
use thiserror::Error;
use tokio::sync::{RwLock, mpsc};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Destination the relay hands staged events to.
///
/// `publish` must only return `Ok` once the event is durably accepted;
/// the relay marks the event delivered on that signal.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &StagedEvent) -> Result<(), PublishError>;
}

/// In-process broker fanning events out over channels.
///
/// Suitable for the single-process deployment and for tests; every
/// published event is also kept in a log for inspection.
pub struct InMemoryBroker {
    subscribers: RwLock<Vec<mpsc::UnboundedSender<StagedEvent>>>,
    published: RwLock<Vec<StagedEvent>>,
    fail_on_publish: Arc<RwLock<bool>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            published: RwLock::new(Vec::new()),
            fail_on_publish: Arc::new(RwLock::new(false)),
        }
    }

    /// Registers a subscriber and returns its event stream.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<StagedEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().await.push(tx);
        rx
    }

    /// Test helper to simulate a broker outage.
    pub async fn set_fail_on_publish(&self, fail: bool) {
        *self.fail_on_publish.write().await = fail;
    }

    /// Test helper returning every event published so far.
    pub async fn published(&self) -> Vec<StagedEvent> {
        self.published.read().await.clone()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryBroker {
    async fn publish(&self, event: &StagedEvent) -> Result<(), PublishError> {
        if *self.fail_on_publish.read().await {
            return Err(PublishError::Unavailable("simulated broker failure".into()));
        }

        self.published.write().await.push(event.clone());

        // Drop subscribers whose receiver is gone.
        self.subscribers
            .write()
            .await
            .retain(|tx| tx.send(event.clone()).is_ok());

        Ok(())
    }
}
