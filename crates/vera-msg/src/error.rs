//! Message pipeline errors.

use thiserror::Error;
use vera_core::{BackendError, ValidationError, VeraError};

/// Why a message was rejected, or why a pipeline collaborator failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// The message arrived without provenance metadata.
    #[error("message has no provenance metadata")]
    MissingProvenance,

    /// A proof, signature or challenge did not verify.
    #[error("proof invalid: {0}")]
    ProofInvalid(String),

    /// The payload is not a recognised message shape.
    #[error("unsupported payload: {0}")]
    UnsupportedPayload(String),

    /// The data store failed.
    #[error("data store error: {0}")]
    Storage(String),

    /// A message source failed to fetch.
    #[error("message source {name} failed: {reason}")]
    Source {
        /// Source type and id.
        name: String,
        /// Diagnostic.
        reason: String,
    },
}

impl MessageError {
    /// Whether this is a terminal rejection of the message itself, as
    /// opposed to a backend failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingProvenance | Self::ProofInvalid(_) | Self::UnsupportedPayload(_)
        )
    }
}

impl From<MessageError> for VeraError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::MissingProvenance => ValidationError::MissingProvenance.into(),
            MessageError::ProofInvalid(r) => ValidationError::ProofInvalid(r).into(),
            MessageError::UnsupportedPayload(r) => {
                ValidationError::Malformed(format!("unsupported payload: {r}")).into()
            }
            MessageError::Storage(r) => BackendError::Storage(r).into(),
            e @ MessageError::Source { .. } => BackendError::Storage(e.to_string()).into(),
        }
    }
}
