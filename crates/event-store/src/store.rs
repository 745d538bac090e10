use async_trait::async_trait;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

/// Persistence collaborator for event-sourced aggregates.
///
/// Implementations must be thread-safe; the per-aggregate serialization of
/// writers is their responsibility and is enforced through the
/// `expected_version` check of [`EventStore::save`].
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends `events` to the stream of `aggregate_id`.
    ///
    /// The append is atomic: either every event is stored or none is. Fails
    /// with [`EventStoreError::ConcurrencyConflict`] when the stream is not
    /// at `expected_version`.
    ///
    /// Returns the stream version after the append.
    async fn save(
        &self,
        aggregate_id: AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<Version>;

    /// Returns the full history of an aggregate, oldest first.
    ///
    /// An aggregate that was never written to has an empty history.
    async fn load_history(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>>;

    /// Returns the current stream version, or None if the stream is empty.
    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;
}

/// Convenience methods available on every event store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Checks whether an aggregate has any stored events.
    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.stream_version(aggregate_id).await?.is_some())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that a batch can be appended to `aggregate_id` at
/// `expected_version`.
///
/// The batch must be non-empty, belong to a single aggregate of a single
/// type, and carry consecutive versions starting right after
/// `expected_version`.
pub fn validate_append(
    aggregate_id: AggregateId,
    expected_version: Version,
    events: &[EventEnvelope],
) -> Result<()> {
    let invalid = |reason: String| EventStoreError::InvalidAppend {
        aggregate_id,
        reason,
    };

    let Some(first) = events.first() else {
        return Err(invalid("cannot append an empty event list".to_string()));
    };

    let mut version = expected_version;
    for event in events {
        if event.aggregate_id != aggregate_id {
            return Err(invalid(format!(
                "event {} belongs to aggregate {}",
                event.event_id, event.aggregate_id
            )));
        }
        if event.aggregate_type != first.aggregate_type {
            return Err(invalid(
                "all events must have the same aggregate type".to_string(),
            ));
        }
        version = version.next();
        if event.version != version {
            return Err(invalid(format!(
                "event versions must be sequential: expected {}, got {}",
                version, event.version
            )));
        }
    }

    Ok(())
}
