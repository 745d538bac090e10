//! Post domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, CommentId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a post aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PostEvent {
    /// Post was created.
    PostCreated(PostCreatedData),

    /// Post message was replaced.
    MessageUpdated(MessageUpdatedData),

    /// Post was liked.
    PostLiked(PostLikedData),

    /// Comment was added to the post.
    CommentAdded(CommentAddedData),

    /// Comment text was edited.
    CommentUpdated(CommentUpdatedData),

    /// Comment was removed from the post.
    CommentRemoved(CommentRemovedData),

    /// Post was deleted.
    PostRemoved(PostRemovedData),
}

impl DomainEvent for PostEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PostEvent::PostCreated(_) => "PostCreated",
            PostEvent::MessageUpdated(_) => "MessageUpdated",
            PostEvent::PostLiked(_) => "PostLiked",
            PostEvent::CommentAdded(_) => "CommentAdded",
            PostEvent::CommentUpdated(_) => "CommentUpdated",
            PostEvent::CommentRemoved(_) => "CommentRemoved",
            PostEvent::PostRemoved(_) => "PostRemoved",
        }
    }
}

/// Data for PostCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostCreatedData {
    /// The new post's ID.
    pub post_id: AggregateId,

    /// Username of the author.
    pub author: String,

    /// Initial message.
    pub message: String,

    /// When the post was created.
    pub date_posted: DateTime<Utc>,
}

/// Data for MessageUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageUpdatedData {
    pub post_id: AggregateId,

    /// The replacement message.
    pub message: String,
}

/// Data for PostLiked event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostLikedData {
    pub post_id: AggregateId,
}

/// Data for CommentAdded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAddedData {
    pub post_id: AggregateId,

    /// Identifier generated for the new comment.
    pub comment_id: CommentId,

    /// Comment text.
    pub comment: String,

    /// Commenting user.
    pub username: String,

    /// When the comment was written.
    pub comment_date: DateTime<Utc>,
}

/// Data for CommentUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentUpdatedData {
    pub post_id: AggregateId,
    pub comment_id: CommentId,

    /// Replacement text.
    pub comment: String,

    /// Editing user (always the comment owner).
    pub username: String,

    /// When the comment was edited.
    pub edit_date: DateTime<Utc>,
}

/// Data for CommentRemoved event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRemovedData {
    pub post_id: AggregateId,
    pub comment_id: CommentId,
}

/// Data for PostRemoved event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRemovedData {
    pub post_id: AggregateId,
}

// Convenience constructors for events
impl PostEvent {
    /// Creates a PostCreated event.
    pub fn post_created(
        post_id: AggregateId,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        PostEvent::PostCreated(PostCreatedData {
            post_id,
            author: author.into(),
            message: message.into(),
            date_posted: Utc::now(),
        })
    }

    /// Creates a MessageUpdated event.
    pub fn message_updated(post_id: AggregateId, message: impl Into<String>) -> Self {
        PostEvent::MessageUpdated(MessageUpdatedData {
            post_id,
            message: message.into(),
        })
    }

    /// Creates a PostLiked event.
    pub fn post_liked(post_id: AggregateId) -> Self {
        PostEvent::PostLiked(PostLikedData { post_id })
    }

    /// Creates a CommentAdded event.
    pub fn comment_added(
        post_id: AggregateId,
        comment_id: CommentId,
        comment: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        PostEvent::CommentAdded(CommentAddedData {
            post_id,
            comment_id,
            comment: comment.into(),
            username: username.into(),
            comment_date: Utc::now(),
        })
    }

    /// Creates a CommentUpdated event.
    pub fn comment_updated(
        post_id: AggregateId,
        comment_id: CommentId,
        comment: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        PostEvent::CommentUpdated(CommentUpdatedData {
            post_id,
            comment_id,
            comment: comment.into(),
            username: username.into(),
            edit_date: Utc::now(),
        })
    }

    /// Creates a CommentRemoved event.
    pub fn comment_removed(post_id: AggregateId, comment_id: CommentId) -> Self {
        PostEvent::CommentRemoved(CommentRemovedData {
            post_id,
            comment_id,
        })
    }

    /// Creates a PostRemoved event.
    pub fn post_removed(post_id: AggregateId) -> Self {
        PostEvent::PostRemoved(PostRemovedData { post_id })
    }

    /// Returns the post this event belongs to.
    pub fn post_id(&self) -> AggregateId {
        match self {
            PostEvent::PostCreated(data) => data.post_id,
            PostEvent::MessageUpdated(data) => data.post_id,
            PostEvent::PostLiked(data) => data.post_id,
            PostEvent::CommentAdded(data) => data.post_id,
            PostEvent::CommentUpdated(data) => data.post_id,
            PostEvent::CommentRemoved(data) => data.post_id,
            PostEvent::PostRemoved(data) => data.post_id,
        }
    }
}
