//! # vera-msg: Message Pipeline
//!
//! Everything the agent receives, whether posted to its endpoint or pulled
//! by a sync source, enters as a [`RawMessage`] and leaves as either a
//! [`MessageEvent::ValidatedMessage`] or a logged rejection.
//!
//! - [`MessagePipeline`] hashes, deduplicates, validates and emits.
//! - [`MessageValidator`] recognises SDR tokens, credentials and
//!   presentations, optionally wrapped in a `{tag, body}` envelope.
//! - [`DataStore`] persists validated messages; [`PersistMessageHandler`]
//!   and [`SessionNotifyHandler`] are the stock subscribers.
//! - [`SyncServices`] pulls from [`MessageSource`]s incrementally.

pub mod error;
pub mod events;
pub mod handlers;
pub mod message;
pub mod pipeline;
pub mod store;
pub mod sync;
pub mod validator;

pub use error::MessageError;
pub use events::{MessageEvent, MessageEventKind};
pub use handlers::{PersistMessageHandler, SessionEvent, SessionHub, SessionNotifyHandler};
pub use message::{Message, MessageMeta, MessageType, RawMessage};
pub use pipeline::{IngestOutcome, MessagePipeline};
pub use store::{DataStore, MemoryDataStore, MessageFilter, SourceTimestamp};
pub use sync::{MessageSource, SourceBatch, SyncReport, SyncServices};
pub use validator::MessageValidator;
