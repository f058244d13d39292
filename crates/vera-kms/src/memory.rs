//! In-memory key store for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use vera_crypto::{Ed25519KeyPair, X25519KeyPair};

use crate::error::KmsError;
use crate::store::KeyStore;
use crate::types::{KeyId, KeyKind, KeyPair};

/// Private key material held by the memory store. Both dalek key types
/// zeroize themselves on drop.
enum Secret {
    Ed25519(Ed25519KeyPair),
    X25519(X25519KeyPair),
}

struct Entry {
    public: KeyPair,
    secret: Secret,
}

/// Keys held in process memory.
///
/// Key material is protected by OS-level isolation only and is lost on
/// restart.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<KeyId, Entry>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.keys.read();
        f.debug_struct("MemoryKeyStore")
            .field("key_count", &keys.len())
            .field("key_ids", &keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn generate(&self, kind: KeyKind) -> Result<KeyPair, KmsError> {
        let (public, secret) = match kind {
            KeyKind::Ed25519 => {
                let kp = Ed25519KeyPair::generate();
                (KeyPair::new(kind, kp.public_key().as_bytes(), self.name()), Secret::Ed25519(kp))
            }
            KeyKind::X25519 => {
                let kp = X25519KeyPair::generate();
                (KeyPair::new(kind, kp.public_key().as_bytes(), self.name()), Secret::X25519(kp))
            }
        };
        self.keys.write().insert(
            public.key_id.clone(),
            Entry {
                public: public.clone(),
                secret,
            },
        );
        Ok(public)
    }

    async fn get(&self, key_id: &KeyId) -> Result<Option<KeyPair>, KmsError> {
        Ok(self.keys.read().get(key_id).map(|e| e.public.clone()))
    }

    async fn sign(&self, key_id: &KeyId, payload: &[u8]) -> Result<Vec<u8>, KmsError> {
        let keys = self.keys.read();
        let entry = keys
            .get(key_id)
            .ok_or_else(|| KmsError::KeyNotFound(key_id.to_string()))?;
        match &entry.secret {
            Secret::Ed25519(kp) => Ok(kp.sign(payload).as_bytes().to_vec()),
            Secret::X25519(_) => Err(KmsError::NotSigningKey(key_id.to_string())),
        }
    }

    async fn list(&self) -> Result<Vec<KeyPair>, KmsError> {
        let mut keys: Vec<KeyPair> = self.keys.read().values().map(|e| e.public.clone()).collect();
        keys.sort_by(|a, b| a.key_id.cmp(&b.key_id));
        Ok(keys)
    }
}
