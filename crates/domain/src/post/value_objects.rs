//! Value objects for the post domain.

use serde::{Deserialize, Serialize};

/// A comment as held by the post aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment body.
    pub text: String,

    /// User who wrote (or last edited) the comment.
    pub username: String,
}

impl Comment {
    /// Creates a new comment.
    pub fn new(text: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            username: username.into(),
        }
    }

    /// Returns true if `username` wrote this comment.
    pub fn is_owned_by(&self, username: &str) -> bool {
        same_user(&self.username, username)
    }
}

/// Compares usernames ignoring case.
pub fn same_user(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// True for empty or whitespace-only text.
pub(crate) fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
