//! # Typed Event Bus
//!
//! In-process publish/subscribe keyed by an event's *kind*.
//!
//! - Subscribers for a kind run sequentially, in subscription order.
//! - [`EventBus::emit`] snapshots the subscriber list, spawns a single task
//!   that awaits each handler in turn, and returns a [`Dispatch`] immediately.
//!   The emitter never waits on its subscribers.
//! - A handler error stops the remaining handlers of that emission. A later
//!   subscriber therefore never observes an event that an earlier one failed
//!   to process.
//!
//! Subscribing while an emission is in flight does not affect that emission.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::task::JoinHandle;

/// An event that can travel through an [`EventBus`].
pub trait Event: Clone + Send + Sync + 'static {
    /// Discriminant used to route the event to subscribers.
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// The kind of this event.
    fn kind(&self) -> Self::Kind;
}

/// Failure reported by an event handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    /// Create a handler error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<crate::VeraError> for HandlerError {
    fn from(err: crate::VeraError) -> Self {
        Self(err.to_string())
    }
}

/// A subscriber to events of type `E`.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    /// Name used in logs and dispatch reports.
    fn name(&self) -> &str;

    /// Process one event.
    async fn handle(&self, event: &E) -> Result<(), HandlerError>;
}

struct FnHandler<E, F> {
    name: String,
    f: F,
    _event: PhantomData<fn(E)>,
}

#[async_trait]
impl<E, F, Fut> EventHandler<E> for FnHandler<E, F>
where
    E: Event,
    F: Fn(E) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &E) -> Result<(), HandlerError> {
        (self.f)(event.clone()).await
    }
}

/// Outcome of one emission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Handlers that completed successfully, in the order they ran.
    pub completed: Vec<String>,
    /// The handler that failed, if any, with its error. Handlers after it
    /// were skipped.
    pub failed: Option<(String, HandlerError)>,
}

impl DispatchReport {
    /// Whether every subscribed handler ran to completion.
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }
}

/// Handle to an in-flight emission.
#[derive(Debug)]
pub struct Dispatch {
    task: JoinHandle<DispatchReport>,
}

impl Dispatch {
    /// Wait for every handler of this emission to finish.
    pub async fn wait(self) -> DispatchReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => DispatchReport {
                completed: Vec::new(),
                failed: Some(("<dispatch>".to_string(), HandlerError::new(e.to_string()))),
            },
        }
    }
}

type Subscribers<E> = Vec<Arc<dyn EventHandler<E>>>;

/// Typed publish/subscribe bus.
pub struct EventBus<E: Event> {
    subscribers: RwLock<HashMap<E::Kind, Subscribers<E>>>,
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Event> EventBus<E> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to events of `kind`. Handlers run in the order
    /// they were subscribed.
    pub fn on(&self, kind: E::Kind, handler: Arc<dyn EventHandler<E>>) {
        tracing::debug!(?kind, handler = handler.name(), "event handler subscribed");
        self.subscribers.write().entry(kind).or_default().push(handler);
    }

    /// Subscribe an async closure.
    pub fn on_fn<F, Fut>(&self, kind: E::Kind, name: impl Into<String>, f: F)
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on(
            kind,
            Arc::new(FnHandler {
                name: name.into(),
                f,
                _event: PhantomData,
            }),
        );
    }

    /// Number of subscribers for `kind`.
    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.subscribers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Emit an event. Must be called from within a Tokio runtime.
    pub fn emit(&self, event: E) -> Dispatch {
        self.emit_then(event, |_| {})
    }

    /// Emit an event and run `on_complete` with the report once the last
    /// handler has returned, whether or not anyone waits on the [`Dispatch`].
    pub fn emit_then<F>(&self, event: E, on_complete: F) -> Dispatch
    where
        F: FnOnce(&DispatchReport) + Send + 'static,
    {
        let kind = event.kind();
        let handlers: Subscribers<E> = self
            .subscribers
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let task = tokio::spawn(async move {
            let mut report = DispatchReport::default();
            for handler in handlers {
                match handler.handle(&event).await {
                    Ok(()) => report.completed.push(handler.name().to_string()),
                    Err(err) => {
                        tracing::warn!(
                            ?kind,
                            handler = handler.name(),
                            error = %err,
                            "event handler failed; skipping remaining handlers"
                        );
                        report.failed = Some((handler.name().to_string(), err));
                        break;
                    }
                }
            }
            on_complete(&report);
            report
        });
        Dispatch { task }
    }
}
