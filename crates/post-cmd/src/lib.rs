//! Post command service.
//!
//! Wires the event store, publisher, post handlers and dispatcher together,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod telemetry;

use std::sync::Arc;

use common::AggregateId;
use domain::{
    AddComment, Aggregate, CommandDispatcher, DeletePost, EditComment, InMemoryEventPublisher,
    LikePost, NewPost, PostCommand, PostCommandHandler, RemoveComment,
};
use event_store::{InMemoryEventStore, Version};

use error::AppError;

/// Post handler over the in-process collaborators.
pub type PostHandler = PostCommandHandler<InMemoryEventStore, InMemoryEventPublisher>;

/// The wired command side.
pub struct App {
    pub handler: Arc<PostHandler>,
    pub dispatcher: CommandDispatcher<PostCommand>,
}

/// Creates the command side over a fresh in-memory store and publisher.
pub fn create_app() -> Result<App, AppError> {
    let handler = Arc::new(PostCommandHandler::new(
        InMemoryEventStore::new(),
        InMemoryEventPublisher::new(),
    ));
    let dispatcher = domain::post_dispatcher(handler.clone())?;

    Ok(App {
        handler,
        dispatcher,
    })
}

/// State of the demo post once the scenario finished.
#[derive(Debug, Clone)]
pub struct DemoReport {
    pub post_id: AggregateId,
    pub version: Version,
    pub active: bool,
    pub comment_count: usize,
    pub published: usize,
}

/// Runs a full post lifecycle through the dispatcher: create, like, comment,
/// edit the comment, remove it and delete the post, then replays the post
/// from its history.
#[tracing::instrument(skip(app))]
pub async fn run_demo(app: &App, author: &str) -> Result<DemoReport, AppError> {
    let commenter = "bob";

    let create = NewPost::by(author, "Hello from the post command service");
    let post_id = create.post_id;
    app.dispatcher.send(create.into()).await?;
    app.dispatcher.send(LikePost::new(post_id).into()).await?;
    app.dispatcher
        .send(AddComment::new(post_id, "Nice post!", commenter).into())
        .await?;

    let post = app.handler.repository().load(post_id).await?;
    let comment_id = post
        .comments()
        .keys()
        .next()
        .copied()
        .ok_or(AppError::Scenario("comment was not recorded"))?;

    // Ownership is case-insensitive.
    app.dispatcher
        .send(EditComment::new(post_id, comment_id, "Great post!", commenter.to_uppercase()).into())
        .await?;
    app.dispatcher
        .send(RemoveComment::new(post_id, comment_id, commenter).into())
        .await?;
    app.dispatcher
        .send(DeletePost::new(post_id, author).into())
        .await?;

    let post = app.handler.repository().load(post_id).await?;
    if post.is_active() {
        return Err(AppError::Scenario("post still active after delete"));
    }

    let report = DemoReport {
        post_id,
        version: post.version(),
        active: post.is_active(),
        comment_count: post.comment_count(),
        published: app.handler.publisher().published_count().await,
    };
    tracing::info!(
        %post_id,
        version = %report.version,
        published = report.published,
        "demo post replayed"
    );

    Ok(report)
}
