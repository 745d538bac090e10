//! Identifier types shared by the event store and the domain layer.

mod ids;

pub use ids::{AggregateId, CommentId};
