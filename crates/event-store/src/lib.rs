//! Event store collaborator for the post command engine.
//!
//! Defines the [`EventStore`] contract the command side relies on (atomic,
//! version-checked appends and ordered replay of a single aggregate stream)
//! together with an in-memory implementation.

pub mod error;
pub mod event;
pub mod memory;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use store::{EventStore, EventStoreExt, validate_append};
