//! Command routing.
//!
//! Commands form a closed set: one enum per bounded context, with a
//! fieldless `Kind` discriminator. A [`CommandDispatcherBuilder`] binds
//! exactly one asynchronous handler to each kind during start-up and is then
//! frozen into a [`CommandDispatcher`], which only routes.

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;
use std::time::Instant;

use common::AggregateId;
use futures_util::future::{self, BoxFuture, FutureExt};
use thiserror::Error;

use crate::error::DomainError;

/// A request to perform one domain operation.
pub trait Command: Debug + Send + 'static {
    /// Discriminator used to route the command.
    type Kind: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Returns the kind of this command.
    fn kind(&self) -> Self::Kind;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;
}

/// The payload of a single command kind.
///
/// Lets a handler be written against the concrete payload type while the
/// dispatcher routes the enclosing command enum.
pub trait CommandVariant<C: Command>: Sized + Send + 'static {
    /// Kind under which handlers for this payload are registered.
    const KIND: C::Kind;

    /// Unwraps the payload, handing the command back if it is another kind.
    fn extract(command: C) -> Result<Self, C>;
}

/// Errors raised while registering or routing commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// `send` was called with a kind nobody registered.
    #[error("No command handler registered for {kind}")]
    NoHandler { kind: String },

    /// A second handler was registered for the same kind.
    #[error("A command handler for {kind} is already registered")]
    DuplicateHandler { kind: String },

    /// A payload's `extract` disagrees with its `KIND`.
    #[error("Handler registered for {expected} received a {actual} command")]
    KindMismatch { expected: String, actual: String },
}

type BoxedHandler<C> =
    Box<dyn Fn(C) -> BoxFuture<'static, Result<(), DomainError>> + Send + Sync>;

/// Collects command handlers during start-up.
pub struct CommandDispatcherBuilder<C: Command> {
    handlers: HashMap<C::Kind, BoxedHandler<C>>,
}

impl<C: Command> Default for CommandDispatcherBuilder<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C: Command> CommandDispatcherBuilder<C> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to the kind of payload `P`.
    ///
    /// Fails with [`RoutingError::DuplicateHandler`] if that kind already has
    /// a handler; the existing binding is kept.
    pub fn register<P, H, Fut>(&mut self, handler: H) -> Result<&mut Self, RoutingError>
    where
        P: CommandVariant<C>,
        H: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DomainError>> + Send + 'static,
    {
        let kind = P::KIND;
        if self.handlers.contains_key(&kind) {
            return Err(RoutingError::DuplicateHandler {
                kind: kind.to_string(),
            });
        }

        let boxed: BoxedHandler<C> = Box::new(move |command: C| match P::extract(command) {
            Ok(payload) => handler(payload).boxed(),
            Err(other) => future::ready(Err(DomainError::from(RoutingError::KindMismatch {
                expected: kind.to_string(),
                actual: other.kind().to_string(),
            })))
            .boxed(),
        });
        self.handlers.insert(kind, boxed);

        tracing::debug!(%kind, "command handler registered");
        Ok(self)
    }

    /// Freezes the registry.
    pub fn build(self) -> CommandDispatcher<C> {
        tracing::info!(handlers = self.handlers.len(), "command dispatcher ready");
        CommandDispatcher {
            handlers: self.handlers,
        }
    }
}

/// Routes each command to the single handler registered for its kind.
///
/// The registry is read-only, so a dispatcher can be shared behind an `Arc`
/// and `send` called concurrently.
pub struct CommandDispatcher<C: Command> {
    handlers: HashMap<C::Kind, BoxedHandler<C>>,
}

impl<C: Command> CommandDispatcher<C> {
    /// Starts a new registry.
    pub fn builder() -> CommandDispatcherBuilder<C> {
        CommandDispatcherBuilder::new()
    }

    /// Returns true if a handler is bound to `kind`.
    pub fn handles(&self, kind: C::Kind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Returns the kinds that have a handler, in no particular order.
    pub fn registered_kinds(&self) -> impl Iterator<Item = C::Kind> + '_ {
        self.handlers.keys().copied()
    }

    /// Routes `command` to its handler and returns the handler's outcome
    /// unchanged.
    ///
    /// Fails with [`RoutingError::NoHandler`] when the kind is not
    /// registered. No retries are attempted.
    #[tracing::instrument(
        name = "send_command",
        skip_all,
        fields(kind = %command.kind(), aggregate_id = %command.aggregate_id())
    )]
    pub async fn send(&self, command: C) -> Result<(), DomainError> {
        let kind = command.kind();
        let Some(handler) = self.handlers.get(&kind) else {
            tracing::warn!("no handler registered");
            return Err(RoutingError::NoHandler {
                kind: kind.to_string(),
            }
            .into());
        };

        let started = Instant::now();
        let result = handler(command).await;
        metrics::histogram!("command_duration_seconds", "kind" => kind.to_string())
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(()) => {
                metrics::counter!("commands_dispatched_total", "kind" => kind.to_string())
                    .increment(1);
                tracing::debug!("command handled");
            }
            Err(error) => {
                metrics::counter!("commands_failed_total", "kind" => kind.to_string())
                    .increment(1);
                tracing::debug!(%error, "command failed");
            }
        }

        result
    }
}
