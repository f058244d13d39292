//! Key custody errors.

use thiserror::Error;
use vera_core::{BackendError, NotFoundError, ValidationError, VeraError};
use vera_crypto::CryptoError;

/// Errors raised by key stores and the key manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KmsError {
    /// No store holds a key with this id.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key exists but cannot produce signatures (e.g. an X25519 key).
    #[error("key {0} is not a signing key")]
    NotSigningKey(String),

    /// The backing store failed or is unreachable.
    #[error("key store {store} failed: {reason}")]
    Backend {
        /// Name of the store.
        store: String,
        /// Backend diagnostic. Never contains key material.
        reason: String,
    },

    /// The signing deadline elapsed.
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        /// Operation name.
        operation: String,
        /// Deadline in milliseconds.
        millis: u64,
    },

    /// Key material failed to parse.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<BackendError> for KmsError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout { operation, millis } => Self::Timeout { operation, millis },
            other => Self::Backend {
                store: "unknown".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<KmsError> for VeraError {
    fn from(err: KmsError) -> Self {
        match err {
            KmsError::KeyNotFound(id) => NotFoundError::KeyNotFound(id).into(),
            KmsError::NotSigningKey(id) => {
                ValidationError::Malformed(format!("key {id} is not a signing key")).into()
            }
            KmsError::Backend { store, reason } => {
                BackendError::SigningBackend(format!("{store}: {reason}")).into()
            }
            KmsError::Timeout { operation, millis } => {
                BackendError::Timeout { operation, millis }.into()
            }
            KmsError::Crypto(e) => e.into(),
        }
    }
}
