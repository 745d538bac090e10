//! Domain error types.

use common::AggregateId;
use event_store::{EventStoreError, Version};
use thiserror::Error;

use crate::command::RoutingError;
use crate::post::PostError;
use crate::publisher::PublishError;

/// Errors that can occur while handling a command.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store, including optimistic
    /// concurrency conflicts.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A post operation was rejected by its preconditions.
    #[error("Post error: {0}")]
    Post(#[from] PostError),

    /// The command could not be routed to a handler.
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Stored history could not be replayed into the aggregate.
    #[error(
        "Cannot replay {aggregate_type} {aggregate_id} at version {version} ({event_type}): {reason}"
    )]
    Replay {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
        event_type: String,
        version: Version,
        reason: String,
    },

    /// The command targets an aggregate with no history.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// An aggregate without identity cannot be persisted.
    #[error("Cannot save an uninitialized {aggregate_type} aggregate")]
    Uninitialized { aggregate_type: &'static str },

    /// Persisted events could not be handed to the publisher.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// True when a domain precondition rejected the command. Nothing was
    /// applied; the caller may retry with corrected input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::Post(_) | DomainError::AggregateNotFound { .. }
        )
    }

    /// True when the store rejected the append because the aggregate moved
    /// on since it was loaded.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::EventStore(e) if e.is_concurrency_conflict())
    }

    /// True when reloading the aggregate and sending the same command again
    /// may succeed.
    pub fn is_retryable(&self) -> bool {
        self.is_concurrency_conflict()
    }
}
