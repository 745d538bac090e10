//! Post aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod handlers;
mod value_objects;

pub use aggregate::Post;
pub use commands::*;
pub use events::{
    CommentAddedData, CommentRemovedData, CommentUpdatedData, MessageUpdatedData, PostCreatedData,
    PostEvent, PostLikedData, PostRemovedData,
};
pub use handlers::{PostCommandHandler, post_dispatcher, register_post_handlers};
pub use value_objects::{Comment, same_user};

use common::{AggregateId, CommentId};
use thiserror::Error;

/// Errors that can occur during post operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostError {
    /// The post was deleted; only creation is allowed on an inactive post.
    #[error("Cannot {action} an inactive post")]
    Inactive { action: &'static str },

    /// A required text value is empty or whitespace.
    #[error("The {field} cannot be blank")]
    BlankText { field: &'static str },

    /// The acting user does not own the post or comment.
    #[error("User {username} is not allowed to {action}")]
    Unauthorized {
        username: String,
        action: &'static str,
    },

    /// The comment does not exist on this post.
    #[error("Comment not found: {comment_id}")]
    CommentNotFound { comment_id: CommentId },

    /// A post with this id already exists.
    #[error("Post already created: {post_id}")]
    AlreadyCreated { post_id: AggregateId },
}
