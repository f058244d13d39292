//! # Key Manager
//!
//! Routes key operations to the configured [`KeyStore`] and records which
//! key serves which identifier and purpose. The manager holds no
//! cryptographic logic of its own.
//!
//! ## Concurrency
//!
//! Signing calls for the same key are serialized through a per-key
//! `tokio::sync::Mutex` held in a `DashMap`. Calls for distinct keys proceed
//! concurrently. Binding maps use `parking_lot` locks that are never held
//! across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use vera_core::{with_timeout, Did};

use crate::error::KmsError;
use crate::store::KeyStore;
use crate::types::{KeyId, KeyKind, KeyPair, KeyPurpose};

/// Key custody front door.
pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    bindings: RwLock<HashMap<(Did, KeyPurpose), KeyId>>,
    sign_locks: DashMap<KeyId, Arc<tokio::sync::Mutex<()>>>,
    sign_timeout: Option<Duration>,
}

impl KeyManager {
    /// Create a manager over `store` with no signing deadline.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            bindings: RwLock::new(HashMap::new()),
            sign_locks: DashMap::new(),
            sign_timeout: None,
        }
    }

    /// Apply a deadline to every [`sign`](Self::sign) call.
    pub fn with_sign_timeout(mut self, timeout: Duration) -> Self {
        self.sign_timeout = Some(timeout);
        self
    }

    /// Name of the backing store.
    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Generate and store a new key. The private half is committed to the
    /// store before the public view is returned.
    pub async fn create_key_pair(&self, kind: KeyKind) -> Result<KeyPair, KmsError> {
        let kp = self.store.generate(kind).await?;
        tracing::info!(key_id = %kp.key_id, %kind, store = self.store.name(), "key created");
        Ok(kp)
    }

    /// Create a key of the purpose's default kind and bind it to `did`.
    pub async fn create_key_pair_for_identifier(
        &self,
        did: &Did,
        purpose: KeyPurpose,
    ) -> Result<KeyPair, KmsError> {
        let kp = self.create_key_pair(purpose.default_kind()).await?;
        self.bindings
            .write()
            .insert((did.clone(), purpose), kp.key_id.clone());
        tracing::debug!(%did, %purpose, key_id = %kp.key_id, "key bound to identifier");
        Ok(kp)
    }

    /// Bind an existing key to `did` for `purpose`, replacing any earlier
    /// binding for that pair.
    pub async fn bind(&self, did: &Did, key_id: &KeyId, purpose: KeyPurpose) -> Result<(), KmsError> {
        if self.store.get(key_id).await?.is_none() {
            return Err(KmsError::KeyNotFound(key_id.to_string()));
        }
        self.bindings
            .write()
            .insert((did.clone(), purpose), key_id.clone());
        Ok(())
    }

    /// The key bound to `did` for `purpose`, if any. Side-effect free.
    pub async fn get_key_pair_for_identifier(
        &self,
        did: &Did,
        purpose: KeyPurpose,
    ) -> Result<Option<KeyPair>, KmsError> {
        let key_id = self.bindings.read().get(&(did.clone(), purpose)).cloned();
        match key_id {
            Some(id) => self.store.get(&id).await,
            None => Ok(None),
        }
    }

    /// Look up a key by id.
    pub async fn get(&self, key_id: &KeyId) -> Result<KeyPair, KmsError> {
        self.store
            .get(key_id)
            .await?
            .ok_or_else(|| KmsError::KeyNotFound(key_id.to_string()))
    }

    /// Every key known to the store.
    pub async fn list(&self) -> Result<Vec<KeyPair>, KmsError> {
        self.store.list().await
    }

    /// Sign `payload` with the identified key.
    ///
    /// Never logs the payload or any key material.
    pub async fn sign(&self, key_id: &KeyId, payload: &[u8]) -> Result<Vec<u8>, KmsError> {
        let lock = self.sign_locks.entry(key_id.clone()).or_default().clone();
        let operation = format!("sign with key {key_id}");
        with_timeout(operation, self.sign_timeout, async {
            let _guard = lock.lock().await;
            self.store.sign(key_id, payload).await
        })
        .await
        .map_err(|e| match e {
            KmsError::Backend { reason, .. } => KmsError::Backend {
                store: self.store.name().to_string(),
                reason,
            },
            other => other,
        })
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("store", &self.store.name())
            .field("bindings", &self.bindings.read().len())
            .field("sign_timeout", &self.sign_timeout)
            .finish()
    }
}
