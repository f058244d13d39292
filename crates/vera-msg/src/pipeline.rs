//! # Message Pipeline
//!
//! `Received → Validating → {Validated | Rejected}` per message.
//!
//! 1. The content hash is computed on receipt.
//! 2. The hash is claimed in-process, then checked against the data store.
//!    Either hit short-circuits to [`IngestOutcome::Duplicate`] before any
//!    validation work, which also absorbs races between live intake and
//!    sync.
//! 3. Validation classifies the payload and verifies its proof.
//! 4. A validated message is emitted as [`MessageEvent::ValidatedMessage`],
//!    once per distinct hash. A rejected one is logged and dropped.
//!
//! The claim set only holds hashes in flight. A claim is released when the
//! message is rejected, and otherwise when its emission finishes. By then a
//! successful persist makes the store answer duplicate checks, while a
//! failed one leaves the hash free for a later resubmission or sync pass.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use vera_core::{ContentDigest, Dispatch, EventBus};

use crate::error::MessageError;
use crate::events::MessageEvent;
use crate::message::{Message, RawMessage};
use crate::store::{DataStore, MessageFilter};
use crate::validator::MessageValidator;

/// What happened to one inbound message.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Validated and emitted. `dispatch` completes when every handler ran.
    Validated {
        /// Content hash.
        hash: ContentDigest,
        /// The emission.
        dispatch: Dispatch,
    },
    /// Already claimed or stored. Nothing was done.
    Duplicate {
        /// Content hash.
        hash: ContentDigest,
    },
    /// Refused. Not persisted, not emitted.
    Rejected {
        /// Content hash.
        hash: ContentDigest,
        /// Why.
        reason: MessageError,
    },
    /// The data store could not be consulted. Nothing was done.
    Failed {
        /// Content hash.
        hash: ContentDigest,
        /// The store error.
        error: MessageError,
    },
}

impl IngestOutcome {
    /// Content hash of the message.
    pub fn hash(&self) -> ContentDigest {
        match self {
            Self::Validated { hash, .. }
            | Self::Duplicate { hash }
            | Self::Rejected { hash, .. }
            | Self::Failed { hash, .. } => *hash,
        }
    }

    /// Whether the message was validated.
    pub fn is_validated(&self) -> bool {
        matches!(self, Self::Validated { .. })
    }
}

/// Inbound message processing.
pub struct MessagePipeline {
    validator: MessageValidator,
    store: Arc<dyn DataStore>,
    bus: Arc<EventBus<MessageEvent>>,
    claimed: Arc<Mutex<HashSet<ContentDigest>>>,
}

impl MessagePipeline {
    /// A pipeline validating with `validator`, deduplicating against `store`
    /// and emitting on `bus`.
    pub fn new(
        validator: MessageValidator,
        store: Arc<dyn DataStore>,
        bus: Arc<EventBus<MessageEvent>>,
    ) -> Self {
        Self {
            validator,
            store,
            bus,
            claimed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// The bus validated messages are emitted on.
    pub fn bus(&self) -> &Arc<EventBus<MessageEvent>> {
        &self.bus
    }

    /// The store used for duplicate detection.
    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    /// Hashes claimed by messages still being validated or handled.
    pub fn in_flight(&self) -> usize {
        self.claimed.lock().len()
    }

    /// Fire-and-forget intake. Processing runs on its own task.
    pub fn ingest(self: &Arc<Self>, raw: RawMessage) -> JoinHandle<IngestOutcome> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.process(raw).await })
    }

    /// Process one message to its terminal state.
    pub async fn process(&self, raw: RawMessage) -> IngestOutcome {
        let mut message = Message::new(raw);
        let hash = message.hash;

        if !self.claimed.lock().insert(hash) {
            tracing::debug!(%hash, "duplicate message (in flight)");
            return IngestOutcome::Duplicate { hash };
        }

        match self.store.find_messages(&MessageFilter::by_hash(hash)).await {
            Ok(found) if !found.is_empty() => {
                self.claimed.lock().remove(&hash);
                tracing::debug!(%hash, "duplicate message (stored)");
                return IngestOutcome::Duplicate { hash };
            }
            Ok(_) => {}
            Err(error) => {
                self.claimed.lock().remove(&hash);
                tracing::warn!(%hash, %error, "duplicate check failed");
                return IngestOutcome::Failed { hash, error };
            }
        }

        if let Err(reason) = self.validator.validate(&mut message).await {
            self.claimed.lock().remove(&hash);
            tracing::warn!(%hash, %reason, "message rejected");
            return IngestOutcome::Rejected { hash, reason };
        }

        tracing::info!(
            %hash,
            message_type = ?message.message_type,
            tag = message.tag.as_deref().unwrap_or_default(),
            "message validated"
        );
        let claimed = Arc::clone(&self.claimed);
        let dispatch = self
            .bus
            .emit_then(MessageEvent::ValidatedMessage(Arc::new(message)), move |report| {
                if let Some((handler, error)) = &report.failed {
                    tracing::warn!(
                        %hash,
                        handler = handler.as_str(),
                        %error,
                        "validated message not fully handled; claim released"
                    );
                }
                claimed.lock().remove(&hash);
            });
        IngestOutcome::Validated { hash, dispatch }
    }
}

impl std::fmt::Debug for MessagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePipeline")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use crate::events::MessageEventKind;
    use crate::handlers::PersistMessageHandler;
    use crate::message::{MessageMeta, MessageType};
    use crate::store::{MemoryDataStore, SourceTimestamp};
    use serde_json::json;
    use vera_core::Did;
    use vera_did::{
        CreateIdentifierOptions, IdentifierManager, KeyDidProvider, KeyDidResolver, MemoryDidStore,
        ResolverRegistry,
    };
    use vera_kms::{KeyManager, MemoryKeyStore};
    use vera_vc::{
        CredentialIssuer, CredentialPayload, Ed25519Signature2020, JsonWebSignature2020,
        PresentationPayload, SuiteRegistry, ED25519_SIGNATURE_2020,
    };

    struct Fixture {
        pipeline: Arc<MessagePipeline>,
        store: Arc<MemoryDataStore>,
        issuer: Arc<CredentialIssuer>,
        holder: Did,
    }

    /// Fails the first `failures` saves, then delegates.
    struct FlakyStore {
        inner: Arc<MemoryDataStore>,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl DataStore for FlakyStore {
        async fn initialize(&self) -> Result<(), MessageError> {
            self.inner.initialize().await
        }

        async fn save_message(&self, message: &Message) -> Result<bool, MessageError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(MessageError::Storage("transient outage".into()));
            }
            self.inner.save_message(message).await
        }

        async fn find_messages(&self, filter: &MessageFilter) -> Result<Vec<Message>, MessageError> {
            self.inner.find_messages(filter).await
        }

        async fn latest_message_timestamps(&self) -> Result<Vec<SourceTimestamp>, MessageError> {
            self.inner.latest_message_timestamps().await
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_failed_saves(0).await
    }

    async fn fixture_with_failed_saves(failures: usize) -> Fixture {
        let kms = Arc::new(KeyManager::new(Arc::new(MemoryKeyStore::new())));
        let identifiers = Arc::new(
            IdentifierManager::new(Arc::new(MemoryDidStore::new()))
                .with_provider(Arc::new(KeyDidProvider::new(kms.clone())))
                .unwrap(),
        );
        let mut resolver = ResolverRegistry::new();
        resolver.register(Arc::new(KeyDidResolver)).unwrap();
        let suites = SuiteRegistry::new()
            .with(Arc::new(Ed25519Signature2020))
            .unwrap()
            .with(Arc::new(JsonWebSignature2020))
            .unwrap();
        let holder = identifiers
            .create("did:key", &CreateIdentifierOptions::default())
            .await
            .unwrap()
            .did;
        let issuer = Arc::new(CredentialIssuer::new(identifiers, kms, Arc::new(resolver), suites));

        let store = Arc::new(MemoryDataStore::new());
        let backing: Arc<dyn DataStore> = Arc::new(FlakyStore {
            inner: store.clone(),
            failures: AtomicUsize::new(failures),
        });
        let bus = Arc::new(EventBus::new());
        bus.on(
            MessageEventKind::ValidatedMessage,
            Arc::new(PersistMessageHandler::new(backing.clone())),
        );
        let pipeline = Arc::new(MessagePipeline::new(
            MessageValidator::new(issuer.clone()),
            backing,
            bus,
        ));
        Fixture {
            pipeline,
            store,
            issuer,
            holder,
        }
    }

    async fn login(f: &Fixture, tag: &str) -> String {
        let vp = f
            .issuer
            .create_verifiable_presentation(
                PresentationPayload::new(f.holder.clone(), vec![]),
                Some(tag),
                ED25519_SIGNATURE_2020,
            )
            .await
            .unwrap();
        json!({"tag": tag, "body": vp}).to_string()
    }

    fn post(raw: &str) -> RawMessage {
        RawMessage::new(raw, MessageMeta::new("httpsPost", "localhost/didcomm"))
    }

    #[tokio::test]
    async fn validated_message_is_emitted_and_persisted() {
        let f = fixture().await;
        let raw = login(&f, "abc123").await;

        let outcome = f.pipeline.process(post(&raw)).await;
        let IngestOutcome::Validated { hash, dispatch } = outcome else {
            panic!("expected validation, got {outcome:?}");
        };
        assert!(dispatch.wait().await.is_success());

        let stored = f.store.find_messages(&MessageFilter::by_hash(hash)).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message_type, Some(MessageType::Presentation));
        assert_eq!(stored[0].tag.as_deref(), Some("abc123"));
        assert_eq!(stored[0].issuer.as_ref(), Some(&f.holder));
    }

    #[tokio::test]
    async fn resubmission_is_a_duplicate() {
        let f = fixture().await;
        let raw = login(&f, "abc123").await;

        let first = f.pipeline.process(post(&raw)).await;
        let IngestOutcome::Validated { dispatch, .. } = first else {
            panic!("expected validation, got {first:?}");
        };
        dispatch.wait().await;

        let second = f
            .pipeline
            .process(RawMessage::new(raw.clone(), MessageMeta::new("sync", "elsewhere")))
            .await;
        assert!(matches!(second, IngestOutcome::Duplicate { .. }));
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn failed_save_lets_a_resubmission_through() {
        let f = fixture_with_failed_saves(1).await;
        let raw = login(&f, "abc123").await;

        let first = f.pipeline.process(post(&raw)).await;
        let IngestOutcome::Validated { dispatch, .. } = first else {
            panic!("expected validation, got {first:?}");
        };
        let report = dispatch.wait().await;
        assert_eq!(report.failed.unwrap().0, "persist-message");
        assert!(f.store.is_empty());
        assert_eq!(f.pipeline.in_flight(), 0);

        let again = f
            .pipeline
            .process(RawMessage::new(raw.clone(), MessageMeta::new("sync", "peer")))
            .await;
        let IngestOutcome::Validated { dispatch, .. } = again else {
            panic!("expected revalidation, got {again:?}");
        };
        assert!(dispatch.wait().await.is_success());
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn claims_are_released_once_handled() {
        let f = fixture().await;
        for tag in ["one", "two", "three"] {
            let raw = login(&f, tag).await;
            if let IngestOutcome::Validated { dispatch, .. } = f.pipeline.process(post(&raw)).await {
                dispatch.wait().await;
            }
            let duplicate = f.pipeline.process(post(&raw)).await;
            assert!(matches!(duplicate, IngestOutcome::Duplicate { .. }));
        }
        assert_eq!(f.store.len(), 3);
        assert_eq!(f.pipeline.in_flight(), 0);
    }

    #[tokio::test]
    async fn concurrent_intake_validates_once() {
        let f = fixture().await;
        let raw = login(&f, "abc123").await;

        let handles: Vec<_> = (0..8).map(|_| f.pipeline.ingest(post(&raw))).collect();
        let mut validated = 0;
        for h in handles {
            if let IngestOutcome::Validated { dispatch, .. } = h.await.unwrap() {
                dispatch.wait().await;
                validated += 1;
            }
        }
        assert_eq!(validated, 1);
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn rejection_releases_the_claim() {
        let f = fixture().await;
        let vc = f
            .issuer
            .create_verifiable_credential(
                CredentialPayload::new(f.holder.clone(), json!({"id": f.holder.to_string()})),
                ED25519_SIGNATURE_2020,
            )
            .await
            .unwrap();
        let mut doc = serde_json::to_value(&vc).unwrap();
        doc["issuanceDate"] = json!("2001-01-01T00:00:00Z");
        let raw = doc.to_string();

        for _ in 0..2 {
            let outcome = f.pipeline.process(post(&raw)).await;
            assert!(
                matches!(outcome, IngestOutcome::Rejected { reason: MessageError::ProofInvalid(_), .. }),
                "{outcome:?}"
            );
        }
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn messages_without_provenance_are_rejected() {
        let f = fixture().await;
        let raw = login(&f, "abc123").await;
        let outcome = f
            .pipeline
            .process(RawMessage {
                raw,
                meta: Vec::new(),
            })
            .await;
        assert!(matches!(
            outcome,
            IngestOutcome::Rejected {
                reason: MessageError::MissingProvenance,
                ..
            }
        ));
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn wrong_challenge_is_rejected() {
        let f = fixture().await;
        let vp = f
            .issuer
            .create_verifiable_presentation(
                PresentationPayload::new(f.holder.clone(), vec![]),
                Some("abc123"),
                ED25519_SIGNATURE_2020,
            )
            .await
            .unwrap();
        let raw = json!({"tag": "xyz789", "body": vp}).to_string();
        let outcome = f.pipeline.process(post(&raw)).await;
        assert!(matches!(outcome, IngestOutcome::Rejected { .. }), "{outcome:?}");
    }
}
