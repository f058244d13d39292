//! Inbound and validated messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vera_core::{sha256_raw, ContentDigest, Did, Timestamp};

/// Where a message came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMeta {
    /// Transport kind, e.g. `httpsPost`.
    pub source_type: String,
    /// Transport-specific origin, e.g. `host/didcomm`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl MessageMeta {
    /// Provenance entry for `source_type` / `source_id`.
    pub fn new(source_type: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            source_id: Some(source_id.into()),
        }
    }
}

/// An opaque inbound payload with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Payload as received.
    pub raw: String,
    /// Provenance, oldest first.
    #[serde(default)]
    pub meta: Vec<MessageMeta>,
}

impl RawMessage {
    /// A raw message with one provenance entry.
    pub fn new(raw: impl Into<String>, meta: MessageMeta) -> Self {
        Self {
            raw: raw.into(),
            meta: vec![meta],
        }
    }
}

/// Classification of a validated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Selective disclosure request.
    #[serde(rename = "sdr")]
    Sdr,
    /// Verifiable credential.
    #[serde(rename = "w3c.vc")]
    Credential,
    /// Verifiable presentation.
    #[serde(rename = "w3c.vp")]
    Presentation,
}

impl MessageType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Sdr => "sdr",
            MessageType::Credential => "w3c.vc",
            MessageType::Presentation => "w3c.vp",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message moving through the pipeline.
///
/// `hash` is a pure function of `raw`. `meta` only grows, through
/// [`push_meta`](Self::push_meta). Classification fields stay empty until
/// validation succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// SHA-256 of the raw bytes.
    pub hash: ContentDigest,
    /// Payload as received.
    pub raw: String,
    meta: Vec<MessageMeta>,
    /// Set by validation.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
    /// Correlation tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Signer of the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Did>,
    /// Time asserted by the payload (issuance date, `iat`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    /// When this agent received it.
    pub received_at: Timestamp,
    /// Decoded document or claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Message {
    /// Start tracking `raw`, received now.
    pub fn new(raw: RawMessage) -> Self {
        Self {
            hash: sha256_raw(raw.raw.as_bytes()),
            raw: raw.raw,
            meta: raw.meta,
            message_type: None,
            tag: None,
            issuer: None,
            timestamp: None,
            received_at: Timestamp::now(),
            data: None,
        }
    }

    /// Provenance, oldest first.
    pub fn meta(&self) -> &[MessageMeta] {
        &self.meta
    }

    /// Record another provenance entry.
    pub fn push_meta(&mut self, meta: MessageMeta) {
        self.meta.push(meta);
    }

    /// Whether validation has classified the message.
    pub fn is_validated(&self) -> bool {
        self.message_type.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_message_is_unclassified() {
        let m = Message::new(RawMessage::new("{}", MessageMeta::new("httpsPost", "a/didcomm")));
        assert!(!m.is_validated());
        assert_eq!(m.meta().len(), 1);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["meta"][0]["sourceType"], "httpsPost");
        assert!(json.get("type").is_none());
    }

    #[test]
    fn meta_is_append_only() {
        let mut m = Message::new(RawMessage::new("x", MessageMeta::new("httpsPost", "a")));
        m.push_meta(MessageMeta::new("sync", "b"));
        let sources: Vec<_> = m.meta().iter().map(|x| x.source_type.as_str()).collect();
        assert_eq!(sources, vec!["httpsPost", "sync"]);
    }

    #[test]
    fn message_type_wire_names() {
        assert_eq!(serde_json::to_value(MessageType::Presentation).unwrap(), "w3c.vp");
        assert_eq!(
            serde_json::from_value::<MessageType>(serde_json::json!("sdr")).unwrap(),
            MessageType::Sdr
        );
    }

    proptest! {
        #[test]
        fn hash_ignores_provenance(raw in ".{0,64}", a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            let x = Message::new(RawMessage::new(raw.clone(), MessageMeta::new(a, "one")));
            let y = Message::new(RawMessage { raw: raw.clone(), meta: vec![MessageMeta::new(b, "two"), MessageMeta::new("z", "three")] });
            prop_assert_eq!(x.hash, y.hash);
            prop_assert_eq!(x.hash, sha256_raw(raw.as_bytes()));
        }
    }
}
