//! Hand-off of committed events to downstream consumers.

use std::sync::Arc;

use async_trait::async_trait;
use event_store::{EventEnvelope, EventId};
use thiserror::Error;
use tokio::sync::RwLock;

/// Error returned by an [`EventPublisher`].
#[derive(Debug, Error)]
#[error("Failed to publish event {event_id} ({event_type}): {reason}")]
pub struct PublishError {
    pub event_id: EventId,
    pub event_type: String,
    pub reason: String,
}

/// Messaging collaborator that receives events after they were persisted,
/// typically to feed read-model projections.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one committed event.
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError>;
}

/// Publisher that keeps every published envelope in memory.
#[derive(Clone, Default)]
pub struct InMemoryEventPublisher {
    published: Arc<RwLock<Vec<EventEnvelope>>>,
}

impl InMemoryEventPublisher {
    /// Creates an empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything published so far, in publish order.
    pub async fn published(&self) -> Vec<EventEnvelope> {
        self.published.read().await.clone()
    }

    /// Returns the number of published events.
    pub async fn published_count(&self) -> usize {
        self.published.read().await.len()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError> {
        self.published.write().await.push(envelope.clone());
        Ok(())
    }
}
