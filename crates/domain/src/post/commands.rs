//! Post commands.

use std::fmt;

use common::{AggregateId, CommentId};

use crate::command::{Command, CommandVariant};

/// Command to create a new post.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// The post ID to create.
    pub post_id: AggregateId,

    /// Username of the author.
    pub author: String,

    /// Initial message.
    pub message: String,
}

impl NewPost {
    /// Creates a new NewPost command.
    pub fn new(post_id: AggregateId, author: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            post_id,
            author: author.into(),
            message: message.into(),
        }
    }

    /// Creates a new NewPost command with a generated post ID.
    pub fn by(author: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AggregateId::new(), author, message)
    }
}

/// Command to replace a post's message.
#[derive(Debug, Clone)]
pub struct EditMessage {
    pub post_id: AggregateId,
    pub message: String,
}

impl EditMessage {
    /// Creates a new EditMessage command.
    pub fn new(post_id: AggregateId, message: impl Into<String>) -> Self {
        Self {
            post_id,
            message: message.into(),
        }
    }
}

/// Command to like a post.
#[derive(Debug, Clone)]
pub struct LikePost {
    pub post_id: AggregateId,
}

impl LikePost {
    /// Creates a new LikePost command.
    pub fn new(post_id: AggregateId) -> Self {
        Self { post_id }
    }
}

/// Command to comment on a post.
#[derive(Debug, Clone)]
pub struct AddComment {
    pub post_id: AggregateId,

    /// Comment text.
    pub comment: String,

    /// Commenting user.
    pub username: String,
}

impl AddComment {
    /// Creates a new AddComment command.
    pub fn new(
        post_id: AggregateId,
        comment: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            post_id,
            comment: comment.into(),
            username: username.into(),
        }
    }
}

/// Command to edit one's own comment.
#[derive(Debug, Clone)]
pub struct EditComment {
    pub post_id: AggregateId,
    pub comment_id: CommentId,

    /// Replacement text.
    pub comment: String,

    /// Acting user; must own the comment.
    pub username: String,
}

impl EditComment {
    /// Creates a new EditComment command.
    pub fn new(
        post_id: AggregateId,
        comment_id: CommentId,
        comment: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            post_id,
            comment_id,
            comment: comment.into(),
            username: username.into(),
        }
    }
}

/// Command to remove one's own comment.
#[derive(Debug, Clone)]
pub struct RemoveComment {
    pub post_id: AggregateId,
    pub comment_id: CommentId,

    /// Acting user; must own the comment.
    pub username: String,
}

impl RemoveComment {
    /// Creates a new RemoveComment command.
    pub fn new(post_id: AggregateId, comment_id: CommentId, username: impl Into<String>) -> Self {
        Self {
            post_id,
            comment_id,
            username: username.into(),
        }
    }
}

/// Command to delete a post.
#[derive(Debug, Clone)]
pub struct DeletePost {
    pub post_id: AggregateId,

    /// Acting user; must be the author.
    pub username: String,
}

impl DeletePost {
    /// Creates a new DeletePost command.
    pub fn new(post_id: AggregateId, username: impl Into<String>) -> Self {
        Self {
            post_id,
            username: username.into(),
        }
    }
}

/// Every command the post command side accepts.
#[derive(Debug, Clone)]
pub enum PostCommand {
    NewPost(NewPost),
    EditMessage(EditMessage),
    LikePost(LikePost),
    AddComment(AddComment),
    EditComment(EditComment),
    RemoveComment(RemoveComment),
    DeletePost(DeletePost),
}

/// Discriminator of [`PostCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    NewPost,
    EditMessage,
    LikePost,
    AddComment,
    EditComment,
    RemoveComment,
    DeletePost,
}

impl CommandKind {
    /// All kinds, in declaration order.
    pub const ALL: [CommandKind; 7] = [
        CommandKind::NewPost,
        CommandKind::EditMessage,
        CommandKind::LikePost,
        CommandKind::AddComment,
        CommandKind::EditComment,
        CommandKind::RemoveComment,
        CommandKind::DeletePost,
    ];

    /// Returns the kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::NewPost => "NewPost",
            CommandKind::EditMessage => "EditMessage",
            CommandKind::LikePost => "LikePost",
            CommandKind::AddComment => "AddComment",
            CommandKind::EditComment => "EditComment",
            CommandKind::RemoveComment => "RemoveComment",
            CommandKind::DeletePost => "DeletePost",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Command for PostCommand {
    type Kind = CommandKind;

    fn kind(&self) -> CommandKind {
        match self {
            PostCommand::NewPost(_) => CommandKind::NewPost,
            PostCommand::EditMessage(_) => CommandKind::EditMessage,
            PostCommand::LikePost(_) => CommandKind::LikePost,
            PostCommand::AddComment(_) => CommandKind::AddComment,
            PostCommand::EditComment(_) => CommandKind::EditComment,
            PostCommand::RemoveComment(_) => CommandKind::RemoveComment,
            PostCommand::DeletePost(_) => CommandKind::DeletePost,
        }
    }

    fn aggregate_id(&self) -> AggregateId {
        match self {
            PostCommand::NewPost(cmd) => cmd.post_id,
            PostCommand::EditMessage(cmd) => cmd.post_id,
            PostCommand::LikePost(cmd) => cmd.post_id,
            PostCommand::AddComment(cmd) => cmd.post_id,
            PostCommand::EditComment(cmd) => cmd.post_id,
            PostCommand::RemoveComment(cmd) => cmd.post_id,
            PostCommand::DeletePost(cmd) => cmd.post_id,
        }
    }
}

/// Wires a payload struct into [`PostCommand`]: `From` for building
/// commands and [`CommandVariant`] for routing them.
macro_rules! post_command_variant {
    ($($payload:ident),* $(,)?) => {
        $(
            impl From<$payload> for PostCommand {
                fn from(cmd: $payload) -> Self {
                    PostCommand::$payload(cmd)
                }
            }

            impl CommandVariant<PostCommand> for $payload {
                const KIND: CommandKind = CommandKind::$payload;

                fn extract(command: PostCommand) -> Result<Self, PostCommand> {
                    match command {
                        PostCommand::$payload(cmd) => Ok(cmd),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

post_command_variant!(
    NewPost,
    EditMessage,
    LikePost,
    AddComment,
    EditComment,
    RemoveComment,
    DeletePost,
);
