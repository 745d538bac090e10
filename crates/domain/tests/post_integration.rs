//! Integration tests for the Post command side.
//!
//! These tests drive posts through the dispatcher and handlers against the
//! in-memory store, and verify replay, concurrency handling and routing.

use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, CommentId};
use domain::{
    AddComment, Aggregate, CommandDispatcher, DeletePost, DomainError, EditComment, EditMessage,
    EventPublisher, InMemoryEventPublisher, LikePost, NewPost, Post, PostCommand,
    PostCommandHandler, PostError, PostEvent, PublishError, RemoveComment, RoutingError,
    post_dispatcher, register_post_handlers,
};
use event_store::{EventEnvelope, EventStore, InMemoryEventStore, Version};

type Handler = PostCommandHandler<InMemoryEventStore, InMemoryEventPublisher>;

/// Helper to wire a handler and a dispatcher over fresh collaborators
fn setup() -> (Arc<Handler>, CommandDispatcher<PostCommand>) {
    let handler = Arc::new(PostCommandHandler::new(
        InMemoryEventStore::new(),
        InMemoryEventPublisher::new(),
    ));
    let dispatcher = post_dispatcher(handler.clone()).unwrap();
    (handler, dispatcher)
}

async fn create_post(dispatcher: &CommandDispatcher<PostCommand>, author: &str) -> AggregateId {
    let cmd = NewPost::by(author, "Hello, world");
    let post_id = cmd.post_id;
    dispatcher.send(cmd.into()).await.unwrap();
    post_id
}

async fn add_comment(
    handler: &Handler,
    dispatcher: &CommandDispatcher<PostCommand>,
    post_id: AggregateId,
    username: &str,
) -> CommentId {
    dispatcher
        .send(AddComment::new(post_id, "Nice post", username).into())
        .await
        .unwrap();

    let history = handler.repository().store().load_history(post_id).await.unwrap();
    let last = history.last().unwrap();
    match serde_json::from_value::<PostEvent>(last.payload.clone()).unwrap() {
        PostEvent::CommentAdded(data) => data.comment_id,
        other => panic!("expected CommentAdded, got {other:?}"),
    }
}

mod post_lifecycle {
    use super::*;

    #[tokio::test]
    async fn create_comment_edit_remove_delete() {
        let (handler, dispatcher) = setup();

        let post_id = create_post(&dispatcher, "alice").await;
        let comment_id = add_comment(&handler, &dispatcher, post_id, "bob").await;

        dispatcher
            .send(EditComment::new(post_id, comment_id, "Nicer post", "BOB").into())
            .await
            .unwrap();
        let post = handler.repository().load(post_id).await.unwrap();
        assert_eq!(post.comment(comment_id).unwrap().text, "Nicer post");

        dispatcher
            .send(RemoveComment::new(post_id, comment_id, "bob").into())
            .await
            .unwrap();
        dispatcher
            .send(DeletePost::new(post_id, "Alice").into())
            .await
            .unwrap();

        let post = handler.repository().load(post_id).await.unwrap();
        assert!(!post.is_active());
        assert_eq!(post.comment_count(), 0);
        assert_eq!(post.version(), Version::new(5));
        assert_eq!(post.author(), "alice");

        let published = handler.publisher().published().await;
        let kinds: Vec<_> = published.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            kinds,
            [
                "PostCreated",
                "CommentAdded",
                "CommentUpdated",
                "CommentRemoved",
                "PostRemoved"
            ]
        );
        assert!(published.iter().all(|e| e.aggregate_type == "Post"));
    }

    #[tokio::test]
    async fn edit_message_and_like() {
        let (handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;

        dispatcher
            .send(EditMessage::new(post_id, "Updated").into())
            .await
            .unwrap();
        dispatcher.send(LikePost::new(post_id).into()).await.unwrap();
        dispatcher.send(LikePost::new(post_id).into()).await.unwrap();

        let post = handler.repository().load(post_id).await.unwrap();
        assert_eq!(post.message(), "Updated");
        assert_eq!(post.version(), Version::new(4));
        assert!(post.is_active());
    }

    #[tokio::test]
    async fn replay_is_idempotent() {
        let (handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;
        add_comment(&handler, &dispatcher, post_id, "bob").await;
        add_comment(&handler, &dispatcher, post_id, "carol").await;

        let first = handler.repository().load(post_id).await.unwrap();
        let second = handler.repository().load(post_id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.comment_count(), 2);
        assert_eq!(first.version(), Version::new(3));
    }
}

mod authorization {
    use super::*;

    #[tokio::test]
    async fn only_author_can_delete() {
        let (handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;

        let err = dispatcher
            .send(DeletePost::new(post_id, "mallory").into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Post(PostError::Unauthorized { .. })
        ));
        assert!(handler.repository().load(post_id).await.unwrap().is_active());

        dispatcher
            .send(DeletePost::new(post_id, "ALICE").into())
            .await
            .unwrap();
        assert!(!handler.repository().load(post_id).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn only_comment_owner_can_edit_or_remove() {
        let (handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;
        let comment_id = add_comment(&handler, &dispatcher, post_id, "bob").await;

        // The post author does not own the comment either.
        for username in ["carol", "alice"] {
            let edit = dispatcher
                .send(EditComment::new(post_id, comment_id, "hijacked", username).into())
                .await
                .unwrap_err();
            assert!(matches!(
                edit,
                DomainError::Post(PostError::Unauthorized { .. })
            ));

            let remove = dispatcher
                .send(RemoveComment::new(post_id, comment_id, username).into())
                .await
                .unwrap_err();
            assert!(matches!(
                remove,
                DomainError::Post(PostError::Unauthorized { .. })
            ));
        }

        let post = handler.repository().load(post_id).await.unwrap();
        assert_eq!(post.comment(comment_id).unwrap().text, "Nice post");
        assert_eq!(post.version(), Version::new(2));
    }

    #[tokio::test]
    async fn unknown_comment_is_reported_before_ownership() {
        let (_handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;
        let missing = CommentId::new();

        let err = dispatcher
            .send(RemoveComment::new(post_id, missing, "anyone").into())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Post(PostError::CommentNotFound { comment_id }) if comment_id == missing
        ));
    }
}

mod error_handling {
    use super::*;

    #[tokio::test]
    async fn deleted_post_rejects_every_operation() {
        let (handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;
        let comment_id = add_comment(&handler, &dispatcher, post_id, "bob").await;
        dispatcher
            .send(DeletePost::new(post_id, "alice").into())
            .await
            .unwrap();

        let commands: Vec<PostCommand> = vec![
            EditMessage::new(post_id, "again").into(),
            LikePost::new(post_id).into(),
            AddComment::new(post_id, "late", "bob").into(),
            EditComment::new(post_id, comment_id, "late", "bob").into(),
            RemoveComment::new(post_id, comment_id, "bob").into(),
            DeletePost::new(post_id, "alice").into(),
        ];

        for command in commands {
            let err = dispatcher.send(command).await.unwrap_err();
            assert!(
                matches!(err, DomainError::Post(PostError::Inactive { .. })),
                "unexpected error: {err}"
            );
        }

        assert_eq!(
            handler.repository().load(post_id).await.unwrap().version(),
            Version::new(3)
        );
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let (handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;

        let err = dispatcher
            .send(EditMessage::new(post_id, "   ").into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Post(PostError::BlankText { field: "message" })
        ));

        let err = dispatcher
            .send(AddComment::new(post_id, "", "bob").into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Post(PostError::BlankText { field: "comment" })
        ));

        assert_eq!(handler.publisher().published_count().await, 1);
    }

    #[tokio::test]
    async fn creating_existing_post_fails() {
        let (handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;

        let err = dispatcher
            .send(NewPost::new(post_id, "bob", "mine now").into())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Post(PostError::AlreadyCreated { .. })
        ));
        assert_eq!(
            handler.repository().load(post_id).await.unwrap().author(),
            "alice"
        );
    }

    #[tokio::test]
    async fn command_on_unknown_post_fails() {
        let (handler, dispatcher) = setup();
        let post_id = AggregateId::new();

        let err = dispatcher
            .send(LikePost::new(post_id).into())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::AggregateNotFound { aggregate_id, .. } if aggregate_id == post_id
        ));
        assert!(err.is_validation());
        assert_eq!(handler.repository().store().event_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_stored_event_fails_replay() {
        let (handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;

        let foreign = EventEnvelope::builder()
            .aggregate_id(post_id)
            .aggregate_type("Post")
            .event_type("PostPinned")
            .version(Version::new(2))
            .payload_raw(serde_json::json!({"type": "PostPinned", "data": {"post_id": post_id}}))
            .build();
        handler
            .repository()
            .store()
            .save(post_id, Version::first(), vec![foreign])
            .await
            .unwrap();

        let err = dispatcher
            .send(LikePost::new(post_id).into())
            .await
            .unwrap_err();

        match err {
            DomainError::Replay {
                event_type,
                version,
                ..
            } => {
                assert_eq!(event_type, "PostPinned");
                assert_eq!(version, Version::new(2));
            }
            other => panic!("expected replay error, got {other:?}"),
        }
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn stale_post_is_rejected() {
        let (handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;
        let repository = handler.repository();

        let mut first: Post = repository.load(post_id).await.unwrap();
        let mut second: Post = repository.load(post_id).await.unwrap();
        first.like_post().unwrap();
        second.edit_message("second writer").unwrap();

        repository.save(&mut first).await.unwrap();
        let err = repository.save(&mut second).await.unwrap_err();

        assert!(err.is_concurrency_conflict());
        assert!(err.is_retryable());

        let post = repository.load(post_id).await.unwrap();
        assert_eq!(post.message(), "Hello, world");
        assert_eq!(post.version(), Version::new(2));
    }

    #[tokio::test]
    async fn concurrent_sends_never_lose_events() {
        let (handler, dispatcher) = setup();
        let post_id = create_post(&dispatcher, "alice").await;
        let dispatcher = Arc::new(dispatcher);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move { dispatcher.send(LikePost::new(post_id).into()).await })
            })
            .collect();

        let mut succeeded = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => succeeded += 1,
                Err(err) => assert!(err.is_concurrency_conflict(), "unexpected error: {err}"),
            }
        }

        assert!(succeeded >= 1);
        let post = handler.repository().load(post_id).await.unwrap();
        assert_eq!(post.version(), Version::new(1 + succeeded));
        assert_eq!(
            handler.publisher().published_count().await,
            1 + succeeded as usize
        );
    }
}

mod routing {
    use super::*;

    #[tokio::test]
    async fn unregistered_kind_fails() {
        let handler = Arc::new(PostCommandHandler::new(
            InMemoryEventStore::new(),
            InMemoryEventPublisher::new(),
        ));
        let mut builder = CommandDispatcher::<PostCommand>::builder();
        builder
            .register(move |cmd: NewPost| {
                let handler = handler.clone();
                async move { handler.create_post(cmd).await.map(|_| ()) }
            })
            .unwrap();
        let dispatcher = builder.build();

        let cmd = NewPost::by("alice", "hi");
        let post_id = cmd.post_id;
        dispatcher.send(cmd.into()).await.unwrap();

        let err = dispatcher
            .send(LikePost::new(post_id).into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Routing(RoutingError::NoHandler { ref kind }) if kind == "LikePost"
        ));
    }

    #[tokio::test]
    async fn second_registration_is_rejected() {
        let (handler, _dispatcher) = setup();
        let mut builder = CommandDispatcher::<PostCommand>::builder();

        builder
            .register(|_cmd: LikePost| async { Ok(()) })
            .unwrap();
        let err = register_post_handlers(&mut builder, handler).unwrap_err();

        assert_eq!(
            err,
            RoutingError::DuplicateHandler {
                kind: "LikePost".to_string()
            }
        );
    }
}

mod publishing {
    use super::*;

    struct RejectingPublisher;

    #[async_trait]
    impl EventPublisher for RejectingPublisher {
        async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError> {
            Err(PublishError {
                event_id: envelope.event_id,
                event_type: envelope.event_type.clone(),
                reason: "broker unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn publish_failure_is_reported_after_save() {
        let handler = Arc::new(PostCommandHandler::new(
            InMemoryEventStore::new(),
            RejectingPublisher,
        ));
        let dispatcher = post_dispatcher(handler.clone()).unwrap();

        let cmd = NewPost::by("alice", "hi");
        let post_id = cmd.post_id;
        let err = dispatcher.send(cmd.into()).await.unwrap_err();

        assert!(matches!(err, DomainError::Publish(_)));
        assert!(!err.is_retryable());

        let post = handler.repository().load(post_id).await.unwrap();
        assert_eq!(post.version(), Version::first());
        assert!(post.is_active());
    }
}
