//! The key store backend contract.

use async_trait::async_trait;

use crate::error::KmsError;
use crate::types::{KeyId, KeyKind, KeyPair};

/// A key custody backend.
///
/// Implementations MUST:
/// - never return private key bytes through this trait;
/// - make [`generate`](KeyStore::generate) a single atomic commit, so a
///   cancelled call leaves either a complete key or no key at all;
/// - be safe under concurrent calls for distinct keys.
///
/// The trait is object-safe for use as `Arc<dyn KeyStore>`. A remote HSM
/// backend satisfies the same contract.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Human-readable backend name, recorded on every [`KeyPair`].
    fn name(&self) -> &str;

    /// Generate a key, persist its private half, and return the public view.
    async fn generate(&self, kind: KeyKind) -> Result<KeyPair, KmsError>;

    /// Look up the public view of a key.
    async fn get(&self, key_id: &KeyId) -> Result<Option<KeyPair>, KmsError>;

    /// Sign `payload` with the identified key.
    async fn sign(&self, key_id: &KeyId, payload: &[u8]) -> Result<Vec<u8>, KmsError>;

    /// List every key held by this store.
    async fn list(&self) -> Result<Vec<KeyPair>, KmsError>;
}
