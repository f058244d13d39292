//! Errors raised by cryptographic primitives.

use thiserror::Error;
use vera_core::{ValidationError, VeraError};

/// Error in a cryptographic operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// A multibase or multicodec string could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<CryptoError> for VeraError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::VerificationFailed(m) => ValidationError::ProofInvalid(m).into(),
            CryptoError::KeyError(m) | CryptoError::Encoding(m) => {
                ValidationError::Malformed(m).into()
            }
        }
    }
}
