//! # Composition Root
//!
//! Wires one agent from an [`AgentConfig`]: key custody, identifier
//! providers, resolvers, proof suites, the message pipeline, and every
//! built-in plugin. The HTTP host keeps the returned [`AgentServices`] in its
//! state and never builds these pieces itself.

use std::sync::Arc;

use vera_core::{ConfigurationError, VeraError};
use vera_did::{
    DidStore, FileDidStore, IdentifierManager, KeyDidProvider, KeyDidResolver, MemoryDidStore,
    PublicationConfig, ResolverRegistry, WebDidProvider, WebDidResolver,
};
use vera_kms::{EncryptedFileKeyStore, KeyManager, KeyStore, MemoryKeyStore};
use vera_msg::{
    DataStore, MemoryDataStore, MessageEventKind, MessagePipeline, MessageSource,
    MessageValidator, PersistMessageHandler, SessionHub, SessionNotifyHandler, SyncServices,
};
use vera_sdr::SdrActionHandler;
use vera_vc::{
    ContextRegistry, CredentialIssuer, Ed25519Signature2020, JsonWebSignature2020, SuiteRegistry,
};

use crate::agent::Agent;
use crate::config::{AgentConfig, KeyStoreConfig};
use crate::plugins::{
    CredentialPlugin, DidManagerPlugin, KeyManagerPlugin, MessagePlugin, ResolverPlugin, SdrPlugin,
};

/// Everything a host needs from a composed agent.
#[derive(Clone)]
pub struct AgentServices {
    /// Method routing, event bus and message intake.
    pub agent: Arc<Agent>,
    /// Key custody.
    pub kms: Arc<KeyManager>,
    /// Managed identifiers and their providers.
    pub identifiers: Arc<IdentifierManager>,
    /// DID resolution by method.
    pub resolver: Arc<ResolverRegistry>,
    /// Credential, presentation and token issuance and verification.
    pub issuer: Arc<CredentialIssuer>,
    /// Validated messages.
    pub store: Arc<dyn DataStore>,
    /// Login notifications keyed by session tag.
    pub sessions: Arc<SessionHub>,
    /// Hostname the `did:web` identity is published under.
    pub publication: PublicationConfig,
}

impl std::fmt::Debug for AgentServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentServices")
            .field("agent", &self.agent)
            .field("key_store", &self.kms.store_name())
            .field("publication", &self.publication)
            .finish()
    }
}

async fn key_store(config: &AgentConfig) -> Result<Arc<dyn KeyStore>, VeraError> {
    match &config.key_store {
        KeyStoreConfig::Memory => Ok(Arc::new(MemoryKeyStore::new())),
        KeyStoreConfig::EncryptedFile { dir } => {
            let master_key = config.master_key.as_ref().ok_or_else(|| {
                ConfigurationError::Invalid("encrypted-file key store needs a master key".into())
            })?;
            Ok(Arc::new(EncryptedFileKeyStore::open(dir.clone(), master_key).await?))
        }
    }
}

/// Subdirectory of the key directory holding identifier records.
pub const IDENTIFIER_DIR: &str = "identifiers";

/// Identifiers live next to the keys they use: on disk for the encrypted
/// store, in memory otherwise.
async fn did_store(config: &AgentConfig) -> Result<Arc<dyn DidStore>, VeraError> {
    match &config.key_store {
        KeyStoreConfig::Memory => Ok(Arc::new(MemoryDidStore::new())),
        KeyStoreConfig::EncryptedFile { dir } => {
            Ok(Arc::new(FileDidStore::open(dir.join(IDENTIFIER_DIR)).await?))
        }
    }
}

/// Rebuild key custody bindings from stored identifiers. Later keys of the
/// same purpose replace earlier ones, as they did when they were added.
async fn restore_bindings(kms: &KeyManager, store: &dyn DidStore) -> Result<usize, VeraError> {
    let mut restored = 0;
    for identifier in store.list().await? {
        for key in &identifier.keys {
            match kms.bind(&identifier.did, &key.key_id, key.purpose).await {
                Ok(()) => restored += 1,
                Err(error) => tracing::warn!(
                    did = %identifier.did,
                    key_id = %key.key_id,
                    %error,
                    "stored identifier references an unusable key"
                ),
            }
        }
    }
    Ok(restored)
}

/// Compose an agent. `sources` feed [`Agent::sync_services`].
pub async fn compose(
    config: &AgentConfig,
    sources: Vec<Arc<dyn MessageSource>>,
) -> Result<AgentServices, VeraError> {
    let kms = Arc::new(
        KeyManager::new(key_store(config).await?).with_sign_timeout(config.sign_timeout),
    );

    let did_store = did_store(config).await?;
    let restored = restore_bindings(&kms, did_store.as_ref()).await?;
    if restored > 0 {
        tracing::info!(restored, "key bindings restored from stored identifiers");
    }

    let identifiers = Arc::new(
        IdentifierManager::new(did_store)
            .with_provider(Arc::new(KeyDidProvider::new(kms.clone())))?
            .with_provider(Arc::new(WebDidProvider::new(config.hostname.clone(), kms.clone())))?,
    );

    let mut resolver = ResolverRegistry::new().with_timeout(config.resolve_timeout);
    resolver.register(Arc::new(KeyDidResolver))?;
    resolver.register(Arc::new(WebDidResolver::new(config.resolve_timeout)?))?;
    let resolver = Arc::new(resolver);

    let suites = SuiteRegistry::new()
        .with(Arc::new(Ed25519Signature2020))?
        .with(Arc::new(JsonWebSignature2020))?;
    let issuer = Arc::new(
        CredentialIssuer::new(identifiers.clone(), kms.clone(), resolver.clone(), suites)
            .with_contexts(ContextRegistry::new()),
    );

    let store: Arc<dyn DataStore> = Arc::new(MemoryDataStore::new());
    store.initialize().await?;

    let sessions = Arc::new(SessionHub::new());
    let pipeline = Arc::new(MessagePipeline::new(
        MessageValidator::new(issuer.clone()),
        store.clone(),
        Default::default(),
    ));
    // Order matters: a session listener reads the stored message.
    pipeline.bus().on(
        MessageEventKind::ValidatedMessage,
        Arc::new(PersistMessageHandler::new(store.clone())),
    );
    pipeline.bus().on(
        MessageEventKind::ValidatedMessage,
        Arc::new(SessionNotifyHandler::new(sessions.clone())),
    );

    let sync = sources
        .into_iter()
        .fold(SyncServices::new(pipeline.clone()), SyncServices::with_source);

    let agent = Agent::builder()
        .plugin(Arc::new(KeyManagerPlugin::new(kms.clone())))
        .plugin(Arc::new(DidManagerPlugin::new(identifiers.clone())))
        .plugin(Arc::new(ResolverPlugin::new(resolver.clone())))
        .plugin(Arc::new(CredentialPlugin::new(issuer.clone())))
        .plugin(Arc::new(SdrPlugin::new(SdrActionHandler::new(issuer.clone()))))
        .plugin(Arc::new(MessagePlugin::new(store.clone())))
        .pipeline(pipeline)
        .sync_services(sync)
        .build()?;

    tracing::info!(
        hostname = %config.hostname,
        key_store = kms.store_name(),
        methods = agent.available_methods().len(),
        "agent composed"
    );

    Ok(AgentServices {
        agent: Arc::new(agent),
        kms,
        identifiers,
        resolver,
        issuer,
        store,
        sessions,
        publication: PublicationConfig {
            hostname: config.hostname.clone(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vera_core::ErrorClass;
    use vera_did::{CreateIdentifierOptions, Identifier};
    use vera_kms::{KeyPurpose, MasterKey};

    #[tokio::test]
    async fn default_config_answers_every_builtin_method() {
        let services = compose(&AgentConfig::default(), Vec::new()).await.unwrap();
        let methods = services.agent.available_methods();
        for m in [
            "keyManagerCreate",
            "didManagerCreate",
            "resolveDid",
            "createVerifiableCredential",
            "verifyPresentation",
            "createSelectiveDisclosureRequest",
            "dataStoreGetMessages",
        ] {
            assert!(methods.contains(&m), "missing {m}");
        }
        assert_eq!(services.publication.hostname, "localhost:8080");
    }

    #[tokio::test]
    async fn providers_include_key_and_web() {
        let services = compose(&AgentConfig::default(), Vec::new()).await.unwrap();
        let out = services
            .agent
            .execute("didManagerGetProviders", json!({}))
            .await
            .unwrap();
        assert_eq!(out, json!(["did:key", "did:web"]));
    }

    #[tokio::test]
    async fn encrypted_file_store_survives_recomposition() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig {
            key_store: KeyStoreConfig::EncryptedFile {
                dir: dir.path().to_path_buf(),
            },
            master_key: Some(MasterKey::from_bytes([7u8; 32])),
            ..AgentConfig::default()
        };
        let first = compose(&config, Vec::new()).await.unwrap();
        let created = first
            .agent
            .execute("keyManagerCreate", json!({"kind": "Ed25519"}))
            .await
            .unwrap();
        drop(first);

        let second = compose(&config, Vec::new()).await.unwrap();
        let fetched = second
            .agent
            .execute("keyManagerGet", json!({"keyId": created["keyId"]}))
            .await
            .unwrap();
        assert_eq!(fetched["publicKeyHex"], created["publicKeyHex"]);
    }

    #[tokio::test]
    async fn host_identity_and_its_keys_survive_recomposition() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig {
            hostname: "agent.example".into(),
            key_store: KeyStoreConfig::EncryptedFile {
                dir: dir.path().to_path_buf(),
            },
            master_key: Some(MasterKey::from_bytes([7u8; 32])),
            ..AgentConfig::default()
        };
        let options = CreateIdentifierOptions {
            alias: Some("default".into()),
            path: None,
        };

        let first = compose(&config, Vec::new()).await.unwrap();
        let host = first.identifiers.get_or_create("did:web", &options).await.unwrap();
        let encryption = first
            .identifiers
            .add_key(&host.did, KeyPurpose::Encryption)
            .await
            .unwrap();
        drop(first);

        let second = compose(&config, Vec::new()).await.unwrap();
        let again = second.identifiers.get_or_create("did:web", &options).await.unwrap();
        assert_eq!(again.did, host.did);
        let mut expected_keys = host.keys.clone();
        expected_keys.push(encryption.clone());
        assert_eq!(again.keys, expected_keys);

        let bound = second
            .kms
            .get_key_pair_for_identifier(&host.did, KeyPurpose::Encryption)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bound.key_id, encryption.key_id);
        let signing = second
            .kms
            .get_key_pair_for_identifier(&host.did, KeyPurpose::Signing)
            .await
            .unwrap();
        assert!(signing.is_some());
        assert_eq!(second.kms.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn encrypted_file_store_without_master_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig {
            key_store: KeyStoreConfig::EncryptedFile {
                dir: dir.path().to_path_buf(),
            },
            master_key: None,
            ..AgentConfig::default()
        };
        let err = compose(&config, Vec::new()).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Configuration);
    }

    #[tokio::test]
    async fn identifiers_created_by_method_are_managed() {
        let services = compose(&AgentConfig::default(), Vec::new()).await.unwrap();
        let out = services
            .agent
            .execute("didManagerCreate", json!({"provider": "did:key", "alias": "me"}))
            .await
            .unwrap();
        let created: Identifier = serde_json::from_value(out).unwrap();
        let found = services
            .identifiers
            .get_or_create(
                "did:key",
                &CreateIdentifierOptions {
                    alias: Some("me".into()),
                    path: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(found.did, created.did);
    }
}
