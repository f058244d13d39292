//! Credential layer errors.

use thiserror::Error;
use vera_core::{
    CanonicalizationError, ConfigurationError, NotFoundError, ValidationError, VeraError,
};
use vera_did::DidError;
use vera_kms::KmsError;

/// Errors from issuance, context expansion and suite registration.
///
/// Verification never returns these for untrusted input; it reports a
/// [`VerificationResult`](crate::VerificationResult) instead.
#[derive(Error, Debug)]
pub enum VcError {
    /// The named proof suite is not registered.
    #[error("unknown proof suite: {0}")]
    UnknownSuite(String),

    /// Two suites share one id.
    #[error("duplicate proof suite: {0}")]
    DuplicateSuite(String),

    /// A context id is neither registered locally nor built in.
    #[error("unknown context: {0}")]
    UnknownContext(String),

    /// A document term is not defined by any active context.
    #[error("term \"{0}\" is not defined by any active context")]
    UndefinedTerm(String),

    /// The issuing identifier has no key able to sign.
    #[error("no signing key for identifier: {0}")]
    NoSigningKey(String),

    /// A proof or token failed to verify.
    #[error("proof invalid: {0}")]
    ProofInvalid(String),

    /// The suite does not implement the requested operation.
    #[error("suite {suite} does not support {operation}")]
    Unsupported {
        /// Suite id.
        suite: String,
        /// Operation name.
        operation: &'static str,
    },

    /// Structurally malformed document, context or token.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Identifier management or resolution failed.
    #[error(transparent)]
    Did(#[from] DidError),

    /// Key custody failed while signing.
    #[error(transparent)]
    Kms(#[from] KmsError),

    /// Canonicalization of the signing input failed.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<VcError> for VeraError {
    fn from(err: VcError) -> Self {
        match err {
            VcError::UnknownSuite(s) => ValidationError::UnknownSuite(s).into(),
            VcError::DuplicateSuite(s) => ConfigurationError::DuplicateSuite(s).into(),
            VcError::UnknownContext(c) => ValidationError::UnknownContext(c).into(),
            VcError::UndefinedTerm(t) => ValidationError::UndefinedTerm(t).into(),
            VcError::NoSigningKey(d) => NotFoundError::NoSigningKey(d).into(),
            VcError::ProofInvalid(r) => ValidationError::ProofInvalid(r).into(),
            VcError::Unsupported { suite, operation } => {
                ValidationError::Malformed(format!("suite {suite} does not support {operation}"))
                    .into()
            }
            VcError::Malformed(m) => ValidationError::Malformed(m).into(),
            VcError::Did(e) => e.into(),
            VcError::Kms(e) => e.into(),
            VcError::Canonicalization(e) => e.into(),
            VcError::Json(e) => e.into(),
        }
    }
}
