//! Key-custody backed [`Signer`].

use std::sync::Arc;

use async_trait::async_trait;
use vera_kms::{KeyId, KeyManager};

use crate::error::VcError;
use crate::suite::Signer;

/// Signs through the [`KeyManager`] with one custody key.
pub struct KmsSigner {
    kms: Arc<KeyManager>,
    key_id: KeyId,
    verification_method: String,
}

impl KmsSigner {
    /// A signer for `key_id`, published as `verification_method`.
    pub fn new(kms: Arc<KeyManager>, key_id: KeyId, verification_method: impl Into<String>) -> Self {
        Self {
            kms,
            key_id,
            verification_method: verification_method.into(),
        }
    }
}

#[async_trait]
impl Signer for KmsSigner {
    fn verification_method(&self) -> &str {
        &self.verification_method
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, VcError> {
        Ok(self.kms.sign(&self.key_id, payload).await?)
    }
}

impl std::fmt::Debug for KmsSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsSigner")
            .field("key_id", &self.key_id)
            .field("verification_method", &self.verification_method)
            .finish()
    }
}
