//! Core aggregate and domain event traits.

use std::fmt::Debug;

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Debug + Clone + Send + Sync {
    /// Returns the event kind.
    ///
    /// Stored alongside the payload and checked again on replay.
    fn event_type(&self) -> &'static str;
}

/// Bookkeeping shared by every aggregate: identity, stream version and the
/// queue of events raised but not yet persisted.
///
/// Concrete aggregates embed one of these and expose it through
/// [`Aggregate::root`] / [`Aggregate::root_mut`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRoot<E> {
    id: Option<AggregateId>,
    version: Version,
    uncommitted_events: Vec<E>,
}

impl<E> Default for AggregateRoot<E> {
    fn default() -> Self {
        Self {
            id: None,
            version: Version::initial(),
            uncommitted_events: Vec::new(),
        }
    }
}

impl<E> AggregateRoot<E> {
    /// Returns the aggregate identity, None before the creation event is
    /// applied.
    pub fn id(&self) -> Option<AggregateId> {
        self.id
    }

    /// Records the identity. Called from the apply routine of the creation
    /// event.
    pub fn set_id(&mut self, id: AggregateId) {
        self.id = Some(id);
    }

    /// Returns the number of persisted events reflected in state.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns events raised since the last commit, oldest first.
    pub fn uncommitted_events(&self) -> &[E] {
        &self.uncommitted_events
    }
}

/// Trait for aggregates in an event-sourced system.
///
/// State is never assigned directly: domain operations validate their
/// preconditions against current state and then call
/// [`raise_event`](Aggregate::raise_event), and every mutation happens inside
/// [`apply`](Aggregate::apply). Rebuilding from history goes through the same
/// `apply`, so in-memory state and the event log cannot drift apart.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors its domain operations produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Shared identity/version/pending-events state.
    fn root(&self) -> &AggregateRoot<Self::Event>;

    /// Mutable access to the shared state.
    fn root_mut(&mut self) -> &mut AggregateRoot<Self::Event>;

    /// Mutates state for a single event.
    ///
    /// Must be deterministic and must not fail: events are facts. Implement
    /// it as one exhaustive `match` over the event type.
    fn apply(&mut self, event: &Self::Event);

    /// Returns the aggregate's unique identifier, None for a new, empty
    /// aggregate.
    fn id(&self) -> Option<AggregateId> {
        self.root().id()
    }

    /// Returns the current version.
    fn version(&self) -> Version {
        self.root().version()
    }

    /// Applies a freshly raised event and queues it for persistence.
    fn raise_event(&mut self, event: Self::Event) {
        self.apply(&event);
        self.root_mut().uncommitted_events.push(event);
    }

    /// Applies an already persisted event and advances the version.
    fn apply_historical(&mut self, event: &Self::Event) {
        self.apply(event);
        let root = self.root_mut();
        root.version = root.version.next();
    }

    /// Replays persisted events in order.
    fn replay<'a>(&mut self, events: impl IntoIterator<Item = &'a Self::Event>)
    where
        Self::Event: 'a,
    {
        for event in events {
            self.apply_historical(event);
        }
    }

    /// Builds an aggregate from its full history.
    fn from_history<'a>(events: impl IntoIterator<Item = &'a Self::Event>) -> Self
    where
        Self::Event: 'a,
    {
        let mut aggregate = Self::default();
        aggregate.replay(events);
        aggregate
    }

    /// Returns events raised but not yet persisted.
    fn uncommitted_events(&self) -> &[Self::Event] {
        self.root().uncommitted_events()
    }

    /// Drops the pending events.
    fn clear_uncommitted_events(&mut self) {
        self.root_mut().uncommitted_events.clear();
    }

    /// Marks pending events as persisted: the queue is emptied and the
    /// version moves to the stream version returned by the store.
    fn mark_committed(&mut self, version: Version) {
        let root = self.root_mut();
        root.uncommitted_events.clear();
        root.version = version;
    }
}
