//! Post command handlers and their dispatcher wiring.

use std::sync::Arc;

use event_store::{EventEnvelope, EventStore};

use crate::aggregate::Aggregate;
use crate::command::{CommandDispatcher, CommandDispatcherBuilder, RoutingError};
use crate::error::DomainError;
use crate::publisher::EventPublisher;
use crate::repository::{CommandResult, Repository};

use super::{
    AddComment, DeletePost, EditComment, EditMessage, LikePost, NewPost, Post, PostCommand,
    PostError, RemoveComment,
};

/// Handles every post command.
///
/// Each method loads the post from its history, runs one domain operation,
/// saves the raised events and then hands them to the publisher. A publish
/// failure is reported to the caller, but the events are already stored.
pub struct PostCommandHandler<S: EventStore, P: EventPublisher> {
    repository: Repository<S, Post>,
    publisher: P,
}

impl<S: EventStore, P: EventPublisher> PostCommandHandler<S, P> {
    /// Creates a handler over the given store and publisher.
    pub fn new(store: S, publisher: P) -> Self {
        Self {
            repository: Repository::new(store),
            publisher,
        }
    }

    /// Returns the post repository.
    pub fn repository(&self) -> &Repository<S, Post> {
        &self.repository
    }

    /// Returns the publisher.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Creates a new post.
    #[tracing::instrument(skip(self))]
    pub async fn create_post(&self, cmd: NewPost) -> Result<CommandResult<Post>, DomainError> {
        if self.repository.load_existing(cmd.post_id).await?.is_some() {
            return Err(PostError::AlreadyCreated {
                post_id: cmd.post_id,
            }
            .into());
        }

        let mut post = Post::create(cmd.post_id, cmd.author, cmd.message);
        let events = self.repository.save(&mut post).await?;
        let new_version = post.version();

        self.publish(&events).await?;
        Ok(CommandResult {
            aggregate: post,
            events,
            new_version,
        })
    }

    /// Replaces a post's message.
    #[tracing::instrument(skip(self))]
    pub async fn edit_message(&self, cmd: EditMessage) -> Result<CommandResult<Post>, DomainError> {
        let result = self
            .repository
            .execute(cmd.post_id, |post| post.edit_message(cmd.message))
            .await?;

        self.publish(&result.events).await?;
        Ok(result)
    }

    /// Likes a post.
    #[tracing::instrument(skip(self))]
    pub async fn like_post(&self, cmd: LikePost) -> Result<CommandResult<Post>, DomainError> {
        let result = self
            .repository
            .execute(cmd.post_id, |post| post.like_post())
            .await?;

        self.publish(&result.events).await?;
        Ok(result)
    }

    /// Adds a comment to a post.
    #[tracing::instrument(skip(self))]
    pub async fn add_comment(&self, cmd: AddComment) -> Result<CommandResult<Post>, DomainError> {
        let result = self
            .repository
            .execute(cmd.post_id, |post| {
                post.add_comment(cmd.comment, cmd.username).map(|_| ())
            })
            .await?;

        self.publish(&result.events).await?;
        Ok(result)
    }

    /// Edits a comment on behalf of its owner.
    #[tracing::instrument(skip(self))]
    pub async fn edit_comment(&self, cmd: EditComment) -> Result<CommandResult<Post>, DomainError> {
        let comment_id = cmd.comment_id;

        let result = self
            .repository
            .execute(cmd.post_id, |post| {
                post.edit_comment(comment_id, cmd.comment, cmd.username)
            })
            .await?;

        self.publish(&result.events).await?;
        Ok(result)
    }

    /// Removes a comment on behalf of its owner.
    #[tracing::instrument(skip(self))]
    pub async fn remove_comment(
        &self,
        cmd: RemoveComment,
    ) -> Result<CommandResult<Post>, DomainError> {
        let comment_id = cmd.comment_id;

        let result = self
            .repository
            .execute(cmd.post_id, |post| {
                post.remove_comment(comment_id, &cmd.username)
            })
            .await?;

        self.publish(&result.events).await?;
        Ok(result)
    }

    /// Deletes a post on behalf of its author.
    #[tracing::instrument(skip(self))]
    pub async fn delete_post(&self, cmd: DeletePost) -> Result<CommandResult<Post>, DomainError> {
        let result = self
            .repository
            .execute(cmd.post_id, |post| post.delete_post(&cmd.username))
            .await?;

        self.publish(&result.events).await?;
        Ok(result)
    }

    async fn publish(&self, events: &[EventEnvelope]) -> Result<(), DomainError> {
        for envelope in events {
            self.publisher.publish(envelope).await?;
            metrics::counter!("events_published_total", "event_type" => envelope.event_type.clone())
                .increment(1);
        }
        Ok(())
    }
}

/// Binds one handler per post command kind to `handler`.
pub fn register_post_handlers<S, P>(
    builder: &mut CommandDispatcherBuilder<PostCommand>,
    handler: Arc<PostCommandHandler<S, P>>,
) -> Result<(), RoutingError>
where
    S: EventStore + 'static,
    P: EventPublisher + 'static,
{
    let h = handler.clone();
    builder.register(move |cmd: NewPost| {
        let h = h.clone();
        async move { h.create_post(cmd).await.map(|_| ()) }
    })?;

    let h = handler.clone();
    builder.register(move |cmd: EditMessage| {
        let h = h.clone();
        async move { h.edit_message(cmd).await.map(|_| ()) }
    })?;

    let h = handler.clone();
    builder.register(move |cmd: LikePost| {
        let h = h.clone();
        async move { h.like_post(cmd).await.map(|_| ()) }
    })?;

    let h = handler.clone();
    builder.register(move |cmd: AddComment| {
        let h = h.clone();
        async move { h.add_comment(cmd).await.map(|_| ()) }
    })?;

    let h = handler.clone();
    builder.register(move |cmd: EditComment| {
        let h = h.clone();
        async move { h.edit_comment(cmd).await.map(|_| ()) }
    })?;

    let h = handler.clone();
    builder.register(move |cmd: RemoveComment| {
        let h = h.clone();
        async move { h.remove_comment(cmd).await.map(|_| ()) }
    })?;

    let h = handler;
    builder.register(move |cmd: DeletePost| {
        let h = h.clone();
        async move { h.delete_post(cmd).await.map(|_| ()) }
    })?;

    Ok(())
}

/// Builds a dispatcher that routes every post command to `handler`.
pub fn post_dispatcher<S, P>(
    handler: Arc<PostCommandHandler<S, P>>,
) -> Result<CommandDispatcher<PostCommand>, RoutingError>
where
    S: EventStore + 'static,
    P: EventPublisher + 'static,
{
    let mut builder = CommandDispatcher::builder();
    register_post_handlers(&mut builder, handler)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::post::CommandKind;
    use crate::publisher::InMemoryEventPublisher;
    use common::AggregateId;
    use event_store::{InMemoryEventStore, Version};

    fn handler() -> PostCommandHandler<InMemoryEventStore, InMemoryEventPublisher> {
        PostCommandHandler::new(InMemoryEventStore::new(), InMemoryEventPublisher::new())
    }

    #[tokio::test]
    async fn create_post_persists_and_publishes() {
        let handler = handler();
        let cmd = NewPost::by("alice", "hello");
        let post_id = cmd.post_id;

        let result = handler.create_post(cmd).await.unwrap();

        assert_eq!(result.new_version, Version::first());
        assert_eq!(result.aggregate.author(), "alice");
        assert_eq!(handler.publisher().published_count().await, 1);

        let loaded = handler.repository().load(post_id).await.unwrap();
        assert_eq!(loaded.id(), Some(post_id));
        assert!(loaded.is_active());
    }

    #[tokio::test]
    async fn create_post_twice_is_rejected() {
        let handler = handler();
        let cmd = NewPost::by("alice", "hello");
        handler.create_post(cmd.clone()).await.unwrap();

        let err = handler.create_post(cmd.clone()).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::Post(PostError::AlreadyCreated { post_id }) if post_id == cmd.post_id
        ));
        assert_eq!(handler.repository().store().event_count().await, 1);
        assert_eq!(handler.publisher().published_count().await, 1);
    }

    #[tokio::test]
    async fn rejected_command_publishes_nothing() {
        let handler = handler();
        let cmd = NewPost::by("alice", "hello");
        let post_id = cmd.post_id;
        handler.create_post(cmd).await.unwrap();

        let err = handler
            .delete_post(DeletePost::new(post_id, "mallory"))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(handler.publisher().published_count().await, 1);
    }

    #[tokio::test]
    async fn add_comment_returns_post_with_comment() {
        let handler = handler();
        let cmd = NewPost::by("alice", "hello");
        let post_id = cmd.post_id;
        handler.create_post(cmd).await.unwrap();

        let result = handler
            .add_comment(AddComment::new(post_id, "nice!", "bob"))
            .await
            .unwrap();

        assert_eq!(result.aggregate.comment_count(), 1);
        assert_eq!(result.events[0].event_type, "CommentAdded");
        assert_eq!(result.new_version, Version::new(2));
    }

    #[tokio::test]
    async fn command_on_unknown_post_fails() {
        let handler = handler();

        let err = handler
            .like_post(LikePost::new(AggregateId::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::AggregateNotFound { .. }));
        assert_eq!(handler.publisher().published_count().await, 0);
    }

    #[tokio::test]
    async fn dispatcher_covers_every_kind() {
        let dispatcher = post_dispatcher(Arc::new(handler())).unwrap();

        for kind in CommandKind::ALL {
            assert!(dispatcher.handles(kind), "{kind} has no handler");
        }
    }

    #[tokio::test]
    async fn registering_twice_fails() {
        let handler = Arc::new(handler());
        let mut builder = CommandDispatcher::builder();
        register_post_handlers(&mut builder, handler.clone()).unwrap();

        let err = register_post_handlers(&mut builder, handler).unwrap_err();
        assert_eq!(
            err,
            RoutingError::DuplicateHandler {
                kind: "NewPost".to_string()
            }
        );
    }

    #[tokio::test]
    async fn dispatcher_routes_to_handler() {
        let handler = Arc::new(handler());
        let dispatcher = post_dispatcher(handler.clone()).unwrap();

        let create: PostCommand = NewPost::by("alice", "hello").into();
        let post_id = create.aggregate_id();
        dispatcher.send(create).await.unwrap();
        dispatcher.send(LikePost::new(post_id).into()).await.unwrap();

        let post = handler.repository().load(post_id).await.unwrap();
        assert_eq!(post.version(), Version::new(2));
    }
}
