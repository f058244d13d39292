//! Pipeline events.

use std::sync::Arc;

use vera_core::Event;

use crate::message::Message;

/// Events raised by the message pipeline and sync services.
#[derive(Debug, Clone)]
pub enum MessageEvent {
    /// A message passed validation. Raised once per distinct content hash.
    ValidatedMessage(Arc<Message>),
    /// A sync pass over one source finished.
    SyncCompleted {
        /// `sourceType:sourceId` of the source.
        source: String,
        /// Messages fetched.
        fetched: usize,
    },
}

/// Routing key of a [`MessageEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageEventKind {
    /// [`MessageEvent::ValidatedMessage`].
    ValidatedMessage,
    /// [`MessageEvent::SyncCompleted`].
    SyncCompleted,
}

impl Event for MessageEvent {
    type Kind = MessageEventKind;

    fn kind(&self) -> MessageEventKind {
        match self {
            MessageEvent::ValidatedMessage(_) => MessageEventKind::ValidatedMessage,
            MessageEvent::SyncCompleted { .. } => MessageEventKind::SyncCompleted,
        }
    }
}
