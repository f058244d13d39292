//! # Validated-message handlers
//!
//! Subscribe [`PersistMessageHandler`] before [`SessionNotifyHandler`]: the
//! bus runs handlers in subscription order and stops at the first failure, so
//! a session is only told about a login whose message was persisted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use vera_core::{Did, EventHandler, HandlerError};

use crate::events::MessageEvent;
use crate::message::MessageType;
use crate::store::DataStore;

/// Saves validated messages.
pub struct PersistMessageHandler {
    store: Arc<dyn DataStore>,
}

impl PersistMessageHandler {
    /// Persist into `store`.
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventHandler<MessageEvent> for PersistMessageHandler {
    fn name(&self) -> &str {
        "persist-message"
    }

    async fn handle(&self, event: &MessageEvent) -> Result<(), HandlerError> {
        let MessageEvent::ValidatedMessage(message) = event else {
            return Ok(());
        };
        let inserted = self
            .store
            .save_message(message)
            .await
            .map_err(|e| HandlerError::new(e.to_string()))?;
        if inserted {
            tracing::debug!(hash = %message.hash, "message persisted");
        } else {
            tracing::debug!(hash = %message.hash, "message already persisted");
        }
        Ok(())
    }
}

/// Something a session should hear about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A holder presented for this session.
    LoggedIn {
        /// The presenting DID.
        did: Did,
    },
}

const SESSION_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug)]
struct Session {
    sender: broadcast::Sender<SessionEvent>,
    latest: Option<SessionEvent>,
}

/// Per-tag notification channels.
#[derive(Debug, Default)]
pub struct SessionHub {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionHub {
    /// An empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_session<R>(&self, tag: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(tag.to_string()).or_insert_with(|| Session {
            sender: broadcast::channel(SESSION_CHANNEL_CAPACITY).0,
            latest: None,
        });
        f(session)
    }

    /// Listen for events on `tag`.
    pub fn subscribe(&self, tag: &str) -> broadcast::Receiver<SessionEvent> {
        self.with_session(tag, |s| s.sender.subscribe())
    }

    /// Send `event` to everyone listening on `tag` and remember it as the
    /// latest. Returns the number of listeners reached.
    pub fn notify(&self, tag: &str, event: SessionEvent) -> usize {
        self.with_session(tag, |s| {
            s.latest = Some(event.clone());
            s.sender.send(event).unwrap_or(0)
        })
    }

    /// The most recent event on `tag`.
    pub fn latest(&self, tag: &str) -> Option<SessionEvent> {
        self.sessions.lock().get(tag).and_then(|s| s.latest.clone())
    }
}

/// Tells the tagged session when a presentation arrives.
pub struct SessionNotifyHandler {
    hub: Arc<SessionHub>,
}

impl SessionNotifyHandler {
    /// Notify through `hub`.
    pub fn new(hub: Arc<SessionHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl EventHandler<MessageEvent> for SessionNotifyHandler {
    fn name(&self) -> &str {
        "session-notify"
    }

    async fn handle(&self, event: &MessageEvent) -> Result<(), HandlerError> {
        let MessageEvent::ValidatedMessage(message) = event else {
            return Ok(());
        };
        if message.message_type != Some(MessageType::Presentation) {
            return Ok(());
        }
        if let (Some(tag), Some(did)) = (&message.tag, &message.issuer) {
            let reached = self.hub.notify(tag, SessionEvent::LoggedIn { did: did.clone() });
            tracing::info!(%tag, %did, listeners = reached, "session logged in");
        }
        Ok(())
    }
}
