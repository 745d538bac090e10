//! Loading aggregates from, and saving them to, the event store.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{EventEnvelope, EventStore, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of running a domain operation through the repository.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after the new events were applied and committed.
    pub aggregate: A,

    /// The envelopes that were persisted, oldest first.
    pub events: Vec<EventEnvelope>,

    /// The stream version after the command.
    pub new_version: Version,
}

/// Event-sourced repository for one aggregate type.
///
/// Every load replays the aggregate's full history into a fresh instance;
/// nothing is cached between calls.
pub struct Repository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<fn() -> A>,
}

impl<S, A> Repository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a repository over the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuilds an aggregate from its history.
    ///
    /// An aggregate that was never written to comes back as a default
    /// instance with no identity. Stored events whose kind the aggregate does
    /// not know, whose payload does not decode, or whose versions are out of
    /// sequence fail with [`DomainError::Replay`].
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let history = self.store.load_history(aggregate_id).await?;

        let mut aggregate = A::default();
        for envelope in history {
            let event = decode::<A>(aggregate_id, aggregate.version(), envelope)?;
            aggregate.apply_historical(&event);
        }

        tracing::trace!(
            %aggregate_id,
            version = %aggregate.version(),
            aggregate_type = A::aggregate_type(),
            "aggregate loaded"
        );

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it has no history.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Persists the aggregate's uncommitted events.
    ///
    /// The aggregate's current version is the expected stream version, so a
    /// concurrent writer makes this fail with a concurrency conflict and
    /// leaves the aggregate untouched. On success the pending queue is
    /// cleared and the version advanced.
    pub async fn save(&self, aggregate: &mut A) -> Result<Vec<EventEnvelope>, DomainError> {
        if aggregate.uncommitted_events().is_empty() {
            return Ok(Vec::new());
        }

        let aggregate_id = aggregate.id().ok_or(DomainError::Uninitialized {
            aggregate_type: A::aggregate_type(),
        })?;
        let expected_version = aggregate.version();

        let mut envelopes = Vec::with_capacity(aggregate.uncommitted_events().len());
        let mut version = expected_version;
        for event in aggregate.uncommitted_events() {
            version = version.next();
            envelopes.push(EventEnvelope::new(
                aggregate_id,
                A::aggregate_type(),
                event.event_type(),
                version,
                event,
            )?);
        }

        let new_version = self
            .store
            .save(aggregate_id, expected_version, envelopes.clone())
            .await?;
        aggregate.mark_committed(new_version);

        tracing::debug!(
            %aggregate_id,
            %new_version,
            count = envelopes.len(),
            "events committed"
        );

        Ok(envelopes)
    }

    /// Loads an existing aggregate, runs a domain operation on it and saves
    /// the events it raised.
    ///
    /// Fails with [`DomainError::AggregateNotFound`] when the aggregate has no
    /// history. A rejected operation raises no event and nothing is saved.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        operation: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&mut A) -> Result<(), A::Error> + Send,
        DomainError: From<A::Error>,
    {
        let mut aggregate =
            self.load_existing(aggregate_id)
                .await?
                .ok_or(DomainError::AggregateNotFound {
                    aggregate_type: A::aggregate_type(),
                    aggregate_id,
                })?;

        operation(&mut aggregate)?;

        let events = self.save(&mut aggregate).await?;
        let new_version = aggregate.version();

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }
}

fn decode<A: Aggregate>(
    aggregate_id: AggregateId,
    current: Version,
    envelope: EventEnvelope,
) -> Result<A::Event, DomainError> {
    let replay_error = |reason: String| DomainError::Replay {
        aggregate_type: A::aggregate_type(),
        aggregate_id,
        event_type: envelope.event_type.clone(),
        version: envelope.version,
        reason,
    };

    if envelope.version != current.next() {
        return Err(replay_error(format!(
            "expected version {}, found {}",
            current.next(),
            envelope.version
        )));
    }

    let event: A::Event = serde_json::from_value(envelope.payload.clone())
        .map_err(|e| replay_error(format!("unrecognized event: {e}")))?;

    if event.event_type() != envelope.event_type {
        return Err(replay_error(format!(
            "payload decodes as {}",
            event.event_type()
        )));
    }

    Ok(event)
}
