//! Command side of the post service.
//!
//! This crate provides the core domain abstractions including:
//! - Aggregate trait and AggregateRoot state for event-sourced entities
//! - Repository for replaying and persisting aggregates
//! - Command trait and CommandDispatcher for routing commands to handlers
//! - EventPublisher for handing committed events downstream
//! - Post aggregate with its commands, events and handlers

pub mod aggregate;
pub mod command;
pub mod error;
pub mod post;
pub mod publisher;
pub mod repository;

pub use aggregate::{Aggregate, AggregateRoot, DomainEvent};
pub use command::{
    Command, CommandDispatcher, CommandDispatcherBuilder, CommandVariant, RoutingError,
};
pub use error::DomainError;
pub use post::{
    AddComment, Comment, CommandKind, DeletePost, EditComment, EditMessage, LikePost, NewPost,
    Post, PostCommand, PostCommandHandler, PostError, PostEvent, RemoveComment, post_dispatcher,
    register_post_handlers,
};
pub use publisher::{EventPublisher, InMemoryEventPublisher, PublishError};
pub use repository::{CommandResult, Repository};
