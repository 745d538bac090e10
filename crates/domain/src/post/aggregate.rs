//! Post aggregate implementation.

use std::collections::HashMap;

use common::{AggregateId, CommentId};

use crate::aggregate::{Aggregate, AggregateRoot};

use super::{
    Comment, PostError, PostEvent,
    events::{CommentAddedData, CommentUpdatedData, PostCreatedData},
    value_objects::{is_blank, same_user},
};

/// Post aggregate root.
///
/// A post is created once, may then be edited, liked and commented on, and
/// is logically deleted by its author. Deletion only flips `active`; a
/// deleted post rejects every further operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    root: AggregateRoot<PostEvent>,

    /// False until created, and again after deletion.
    active: bool,

    /// Username of the author.
    author: String,

    /// Current message text.
    message: String,

    /// Comments keyed by their ID.
    comments: HashMap<CommentId, Comment>,
}

impl Aggregate for Post {
    type Event = PostEvent;
    type Error = PostError;

    fn aggregate_type() -> &'static str {
        "Post"
    }

    fn root(&self) -> &AggregateRoot<PostEvent> {
        &self.root
    }

    fn root_mut(&mut self) -> &mut AggregateRoot<PostEvent> {
        &mut self.root
    }

    fn apply(&mut self, event: &PostEvent) {
        match event {
            PostEvent::PostCreated(data) => self.apply_post_created(data),
            PostEvent::MessageUpdated(data) => {
                self.message = data.message.clone();
            }
            PostEvent::PostLiked(_) => {}
            PostEvent::CommentAdded(data) => self.apply_comment_added(data),
            PostEvent::CommentUpdated(data) => self.apply_comment_updated(data),
            PostEvent::CommentRemoved(data) => {
                self.comments.remove(&data.comment_id);
            }
            PostEvent::PostRemoved(_) => {
                self.active = false;
            }
        }
    }
}

// Query methods
impl Post {
    /// Returns true while the post accepts operations.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the author's username.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the current message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns all comments keyed by ID.
    pub fn comments(&self) -> &HashMap<CommentId, Comment> {
        &self.comments
    }

    /// Returns a comment by ID.
    pub fn comment(&self, comment_id: CommentId) -> Option<&Comment> {
        self.comments.get(&comment_id)
    }

    /// Returns the number of comments.
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

// Command methods (validate, then raise exactly one event)
impl Post {
    /// Creates a new post. The creation event is pending until saved.
    pub fn create(
        post_id: AggregateId,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut post = Post::default();
        post.raise_event(PostEvent::post_created(post_id, author, message));
        post
    }

    /// Replaces the message.
    pub fn edit_message(&mut self, message: impl Into<String>) -> Result<(), PostError> {
        let post_id = self.ensure_active("edit the message of")?;

        let message = message.into();
        if is_blank(&message) {
            return Err(PostError::BlankText { field: "message" });
        }

        self.raise_event(PostEvent::message_updated(post_id, message));
        Ok(())
    }

    /// Likes the post.
    pub fn like_post(&mut self) -> Result<(), PostError> {
        let post_id = self.ensure_active("like")?;

        self.raise_event(PostEvent::post_liked(post_id));
        Ok(())
    }

    /// Adds a comment and returns its generated ID.
    pub fn add_comment(
        &mut self,
        comment: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<CommentId, PostError> {
        let post_id = self.ensure_active("comment on")?;

        let comment = comment.into();
        if is_blank(&comment) {
            return Err(PostError::BlankText { field: "comment" });
        }

        let comment_id = CommentId::new();
        self.raise_event(PostEvent::comment_added(post_id, comment_id, comment, username));
        Ok(comment_id)
    }

    /// Replaces the text of a comment owned by `username`.
    pub fn edit_comment(
        &mut self,
        comment_id: CommentId,
        comment: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<(), PostError> {
        let post_id = self.ensure_active("edit a comment on")?;

        let username = username.into();
        self.ensure_comment_owner(comment_id, &username, "edit a comment made by another user")?;

        self.raise_event(PostEvent::comment_updated(
            post_id,
            comment_id,
            comment,
            username,
        ));
        Ok(())
    }

    /// Removes a comment owned by `username`.
    pub fn remove_comment(
        &mut self,
        comment_id: CommentId,
        username: impl AsRef<str>,
    ) -> Result<(), PostError> {
        let post_id = self.ensure_active("remove a comment from")?;
        self.ensure_comment_owner(
            comment_id,
            username.as_ref(),
            "remove a comment made by another user",
        )?;

        self.raise_event(PostEvent::comment_removed(post_id, comment_id));
        Ok(())
    }

    /// Deletes the post. Only the author may do so.
    pub fn delete_post(&mut self, username: impl AsRef<str>) -> Result<(), PostError> {
        let post_id = self.ensure_active("delete")?;

        let username = username.as_ref();
        if !same_user(&self.author, username) {
            return Err(PostError::Unauthorized {
                username: username.to_string(),
                action: "delete a post made by another user",
            });
        }

        self.raise_event(PostEvent::post_removed(post_id));
        Ok(())
    }
}

// Guards and apply helpers
impl Post {
    /// Returns the post ID if the post accepts operations.
    fn ensure_active(&self, action: &'static str) -> Result<AggregateId, PostError> {
        self.root
            .id()
            .filter(|_| self.active)
            .ok_or(PostError::Inactive { action })
    }

    fn ensure_comment_owner(
        &self,
        comment_id: CommentId,
        username: &str,
        action: &'static str,
    ) -> Result<(), PostError> {
        let comment = self
            .comments
            .get(&comment_id)
            .ok_or(PostError::CommentNotFound { comment_id })?;

        if comment.is_owned_by(username) {
            Ok(())
        } else {
            Err(PostError::Unauthorized {
                username: username.to_string(),
                action,
            })
        }
    }

    fn apply_post_created(&mut self, data: &PostCreatedData) {
        self.root.set_id(data.post_id);
        self.author = data.author.clone();
        self.message = data.message.clone();
        self.active = true;
    }

    fn apply_comment_added(&mut self, data: &CommentAddedData) {
        self.comments.insert(
            data.comment_id,
            Comment::new(data.comment.clone(), data.username.clone()),
        );
    }

    fn apply_comment_updated(&mut self, data: &CommentUpdatedData) {
        // Upsert: the edited text replaces the stored entry entirely.
        self.comments.insert(
            data.comment_id,
            Comment::new(data.comment.clone(), data.username.clone()),
        );
    }
}
