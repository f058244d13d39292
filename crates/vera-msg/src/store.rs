//! # Data Store
//!
//! Persistence contract for validated messages. Records are keyed by content
//! hash and the first writer wins: saving a hash that is already present
//! leaves the stored record untouched.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use vera_core::{ContentDigest, Did, Timestamp};

use crate::error::MessageError;
use crate::message::{Message, MessageType};

/// Selects messages. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFilter {
    /// Exact content hash.
    #[serde(default)]
    pub hash: Option<ContentDigest>,
    /// Message type.
    #[serde(default, rename = "type")]
    pub message_type: Option<MessageType>,
    /// Correlation tag.
    #[serde(default)]
    pub tag: Option<String>,
    /// Signer.
    #[serde(default)]
    pub issuer: Option<Did>,
}

impl MessageFilter {
    /// Match one hash.
    pub fn by_hash(hash: ContentDigest) -> Self {
        Self {
            hash: Some(hash),
            ..Self::default()
        }
    }

    /// Whether `m` matches.
    pub fn matches(&self, m: &Message) -> bool {
        self.hash.map_or(true, |h| m.hash == h)
            && self.message_type.map_or(true, |t| m.message_type == Some(t))
            && self.tag.as_ref().map_or(true, |t| m.tag.as_ref() == Some(t))
            && self.issuer.as_ref().map_or(true, |d| m.issuer.as_ref() == Some(d))
    }
}

/// Newest receive time seen from one source, on the local clock.
///
/// Sync uses it only as a fallback resume position; see [`crate::sync`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTimestamp {
    /// Transport kind.
    pub source_type: String,
    /// Transport origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Receive time of the newest message from this source.
    pub timestamp: Timestamp,
}

/// Persistence for validated messages.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Prepare the store. Calling it again is a no-op.
    async fn initialize(&self) -> Result<(), MessageError>;

    /// Persist `message`. Returns `false` if its hash was already stored, in
    /// which case nothing changes.
    async fn save_message(&self, message: &Message) -> Result<bool, MessageError>;

    /// Messages matching `filter`, oldest first.
    async fn find_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>, MessageError>;

    /// Per-source newest receive time, for incremental sync.
    async fn latest_message_timestamps(&self) -> Result<Vec<SourceTimestamp>, MessageError>;
}

#[derive(Debug, Default)]
struct Inner {
    initialized: bool,
    messages: Vec<Message>,
    by_hash: HashMap<ContentDigest, usize>,
}

/// In-memory [`DataStore`].
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    inner: RwLock<Inner>,
}

impl MemoryDataStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.inner.read().messages.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn initialize(&self) -> Result<(), MessageError> {
        let mut inner = self.inner.write();
        if !inner.initialized {
            inner.initialized = true;
            tracing::debug!("memory data store initialized");
        }
        Ok(())
    }

    async fn save_message(&self, message: &Message) -> Result<bool, MessageError> {
        let mut inner = self.inner.write();
        if inner.by_hash.contains_key(&message.hash) {
            return Ok(false);
        }
        let idx = inner.messages.len();
        inner.messages.push(message.clone());
        inner.by_hash.insert(message.hash, idx);
        Ok(true)
    }

    async fn find_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>, MessageError> {
        let inner = self.inner.read();
        if let Some(hash) = filter.hash {
            return Ok(inner
                .by_hash
                .get(&hash)
                .map(|&i| &inner.messages[i])
                .filter(|m| filter.matches(m))
                .cloned()
                .into_iter()
                .collect());
        }
        Ok(inner
            .messages
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn latest_message_timestamps(&self) -> Result<Vec<SourceTimestamp>, MessageError> {
        let inner = self.inner.read();
        let mut latest: BTreeMap<(String, Option<String>), Timestamp> = BTreeMap::new();
        for m in &inner.messages {
            for meta in m.meta() {
                let key = (meta.source_type.clone(), meta.source_id.clone());
                let entry = latest.entry(key).or_insert(m.received_at);
                if m.received_at > *entry {
                    *entry = m.received_at;
                }
            }
        }
        Ok(latest
            .into_iter()
            .map(|((source_type, source_id), timestamp)| SourceTimestamp {
                source_type,
                source_id,
                timestamp,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageMeta, RawMessage};

    fn msg(raw: &str, source: &str) -> Message {
        Message::new(RawMessage::new(raw, MessageMeta::new(source, "host")))
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let store = MemoryDataStore::new();
        store.initialize().await.unwrap();
        store.save_message(&msg("a", "httpsPost")).await.unwrap();
        store.initialize().await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn first_writer_wins() {
        let store = MemoryDataStore::new();
        let mut first = msg("same", "httpsPost");
        first.tag = Some("first".into());
        let mut second = msg("same", "sync");
        second.tag = Some("second".into());

        assert!(store.save_message(&first).await.unwrap());
        assert!(!store.save_message(&second).await.unwrap());
        let found = store.find_messages(&MessageFilter::by_hash(first.hash)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn filters_and_order() {
        let store = MemoryDataStore::new();
        let mut a = msg("a", "httpsPost");
        a.message_type = Some(MessageType::Presentation);
        a.tag = Some("t1".into());
        let mut b = msg("b", "httpsPost");
        b.message_type = Some(MessageType::Credential);
        let mut c = msg("c", "httpsPost");
        c.message_type = Some(MessageType::Presentation);
        for m in [&a, &b, &c] {
            store.save_message(m).await.unwrap();
        }

        let all = store.find_messages(&MessageFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|m| m.raw.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c"]);

        let vps = store
            .find_messages(&MessageFilter {
                message_type: Some(MessageType::Presentation),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(vps.len(), 2);

        let tagged = store
            .find_messages(&MessageFilter {
                tag: Some("t1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tagged, vec![a]);
    }

    #[tokio::test]
    async fn latest_timestamps_per_source() {
        let store = MemoryDataStore::new();
        let mut old = msg("old", "sync");
        old.received_at = Timestamp::from_unix(100).unwrap();
        let mut new = msg("new", "sync");
        new.received_at = Timestamp::from_unix(200).unwrap();
        let mut post = msg("post", "httpsPost");
        post.received_at = Timestamp::from_unix(150).unwrap();
        for m in [&new, &old, &post] {
            store.save_message(m).await.unwrap();
        }

        let latest = store.latest_message_timestamps().await.unwrap();
        assert_eq!(latest.len(), 2);
        let sync = latest.iter().find(|l| l.source_type == "sync").unwrap();
        assert_eq!(sync.timestamp.unix(), 200);
        let post_ts = latest.iter().find(|l| l.source_type == "httpsPost").unwrap();
        assert_eq!(post_ts.timestamp.unix(), 150);
    }
}
