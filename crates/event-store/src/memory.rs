use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{EventStore, validate_append},
};

/// In-memory event store.
///
/// Keeps one ordered stream per aggregate behind a single lock, so the
/// version check and the append of [`EventStore::save`] happen atomically.
/// Clones share the same streams.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<AggregateId, Vec<EventEnvelope>>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored across all streams.
    pub async fn event_count(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }

    /// Returns the ids of every aggregate with at least one event.
    pub async fn aggregate_ids(&self) -> Vec<AggregateId> {
        self.streams.read().await.keys().copied().collect()
    }

    /// Drops all streams.
    pub async fn clear(&self) {
        self.streams.write().await.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn save(
        &self,
        aggregate_id: AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<Version> {
        validate_append(aggregate_id, expected_version, &events)?;

        let mut streams = self.streams.write().await;

        let current_version = streams
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map(|e| e.version)
            .unwrap_or(Version::initial());

        if current_version != expected_version {
            tracing::debug!(
                %aggregate_id,
                %expected_version,
                %current_version,
                "rejecting append on stale version"
            );
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: current_version,
            });
        }

        let last_version = events.last().map(|e| e.version).unwrap_or(current_version);
        streams.entry(aggregate_id).or_default().extend(events);

        Ok(last_version)
    }

    async fn load_history(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let streams = self.streams.read().await;
        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    async fn stream_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map(|e| e.version))
    }
}
