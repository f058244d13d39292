//! DID layer errors.

use thiserror::Error;
use vera_core::{
    BackendError, ConfigurationError, NotFoundError, ValidationError, VeraError,
};
use vera_kms::KmsError;

/// Errors raised by resolvers, providers and the identifier manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DidError {
    /// No resolver is registered for the DID method.
    #[error("unsupported DID method: {0}")]
    UnsupportedMethod(String),

    /// The resolver errored or reported the DID as not found.
    #[error("resolution of {did} failed: {reason}")]
    ResolutionFailed {
        /// The DID being resolved.
        did: String,
        /// Diagnostic.
        reason: String,
    },

    /// A deadline elapsed.
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        /// Operation name.
        operation: String,
        /// Deadline in milliseconds.
        millis: u64,
    },

    /// The DID is not managed by this agent.
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// No provider registered under this name.
    #[error("unknown DID provider: {0}")]
    UnknownProvider(String),

    /// The provider does not implement this operation.
    #[error("provider {provider} does not support {operation}")]
    Unsupported {
        /// Provider name.
        provider: String,
        /// Operation name.
        operation: &'static str,
    },

    /// Two resolvers claim one method.
    #[error("duplicate resolver for DID method: {0}")]
    DuplicateResolver(String),

    /// Two providers share one name.
    #[error("duplicate DID provider: {0}")]
    DuplicateProvider(String),

    /// A document is structurally invalid or a key cannot be decoded.
    #[error("invalid DID document: {0}")]
    InvalidDocument(String),

    /// The referenced verification method is absent or not authorized for
    /// the requested relationship.
    #[error("verification method {method} is not usable for {relationship}")]
    KeyNotAuthorized {
        /// Verification method id.
        method: String,
        /// Relationship name.
        relationship: String,
    },

    /// Identifier persistence failed.
    #[error("identifier store error: {0}")]
    Storage(String),

    /// Input validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Key custody failure.
    #[error(transparent)]
    Kms(#[from] KmsError),
}

impl From<BackendError> for DidError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout { operation, millis } => Self::Timeout { operation, millis },
            BackendError::ResolutionFailed { did, reason } => Self::ResolutionFailed { did, reason },
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<DidError> for VeraError {
    fn from(err: DidError) -> Self {
        match err {
            DidError::UnsupportedMethod(m) => NotFoundError::UnsupportedMethod(m).into(),
            DidError::ResolutionFailed { did, reason } => {
                BackendError::ResolutionFailed { did, reason }.into()
            }
            DidError::Timeout { operation, millis } => {
                BackendError::Timeout { operation, millis }.into()
            }
            DidError::UnknownIdentifier(d) => NotFoundError::UnknownIdentifier(d).into(),
            DidError::UnknownProvider(p) => NotFoundError::UnknownProvider(p).into(),
            DidError::Unsupported { provider, operation } => {
                NotFoundError::UnsupportedMethod(format!("{operation} for provider {provider}")).into()
            }
            DidError::DuplicateResolver(m) => ConfigurationError::DuplicateResolver(m).into(),
            DidError::DuplicateProvider(p) => {
                ConfigurationError::Invalid(format!("duplicate DID provider: {p}")).into()
            }
            DidError::InvalidDocument(m) => ValidationError::Malformed(m).into(),
            e @ DidError::KeyNotAuthorized { .. } => ValidationError::ProofInvalid(e.to_string()).into(),
            DidError::Storage(m) => BackendError::Storage(m).into(),
            DidError::Validation(v) => v.into(),
            DidError::Kms(k) => k.into(),
        }
    }
}
