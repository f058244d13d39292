//! # Error Taxonomy
//!
//! Structured error types for the whole agent, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Errors fall into four families, reported by [`VeraError::class()`]:
//!
//! | Family | Meaning | Caller action |
//! |--------|---------|---------------|
//! | [`ErrorClass::Configuration`] | composition is wrong | fatal at startup |
//! | [`ErrorClass::NotFound`] | a named thing does not exist | surface to caller |
//! | [`ErrorClass::Validation`] | input rejected, nothing committed | fix input |
//! | [`ErrorClass::Backend`] | store / network / deadline failure | retry at caller's discretion |
//!
//! The core never retries on its own. Proof verification failures are not
//! errors at all; they are reported as data by the verifier.

use thiserror::Error;

/// Top-level error type for the agent.
#[derive(Error, Debug)]
pub enum VeraError {
    /// Composition-time misconfiguration.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A referenced method, identifier, key, or DID method does not exist.
    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Input was rejected before any state was committed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A backend (key store, resolver, persistence) failed or timed out.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Canonicalization failure while computing signing input or digests.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The error family of a [`VeraError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Fatal at startup.
    Configuration,
    /// Typed absence.
    NotFound,
    /// Rejected input.
    Validation,
    /// Retryable backend failure.
    Backend,
}

impl VeraError {
    /// Classify this error into its family.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Configuration(_) => ErrorClass::Configuration,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::Validation(_) | Self::Canonicalization(_) | Self::Json(_) => {
                ErrorClass::Validation
            }
            Self::Backend(_) => ErrorClass::Backend,
        }
    }

    /// Whether a caller may reasonably retry the operation.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Backend
    }
}

/// Composition-time errors. Never recovered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Two plugins declare the same method name.
    #[error("method {method} is declared by both {first} and {second}")]
    CapabilityConflict {
        /// The conflicting method name.
        method: String,
        /// The plugin registered first.
        first: String,
        /// The plugin that attempted to register the same name.
        second: String,
    },

    /// A plugin the composition requires was not supplied.
    #[error("missing required plugin: {0}")]
    MissingPlugin(String),

    /// Two proof suites share an identifier.
    #[error("duplicate proof suite: {0}")]
    DuplicateSuite(String),

    /// Two resolvers claim the same DID method.
    #[error("duplicate resolver for DID method: {0}")]
    DuplicateResolver(String),

    /// A method's argument schema does not compile.
    #[error("invalid argument schema for {method}: {reason}")]
    InvalidSchema {
        /// Method whose schema is broken.
        method: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// Any other invalid setting.
    #[error("{0}")]
    Invalid(String),
}

/// Typed absence. Never silently defaulted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    /// No plugin implements the method.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The identifier is not managed by this agent.
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// The key does not exist in any key store.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// No resolver is registered for the DID method.
    #[error("unsupported DID method: {0}")]
    UnsupportedMethod(String),

    /// The identifier has no key usable for the requested signature.
    #[error("no signing key for identifier: {0}")]
    NoSigningKey(String),

    /// No DID provider is registered under the name.
    #[error("unknown DID provider: {0}")]
    UnknownProvider(String),
}

/// Rejected input. No partial state is committed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Arguments do not match the method's declared schema.
    #[error("invalid arguments for {method}: {reason}")]
    InvalidArguments {
        /// The called method.
        method: String,
        /// Schema diagnostics.
        reason: String,
    },

    /// A message arrived without any provenance metadata.
    #[error("message has no provenance metadata")]
    MissingProvenance,

    /// A proof did not verify.
    #[error("proof invalid: {0}")]
    ProofInvalid(String),

    /// A JSON-LD context is not registered locally or globally.
    #[error("unknown context: {0}")]
    UnknownContext(String),

    /// A document uses a term that none of its contexts define.
    #[error("term \"{0}\" is not defined by any active context")]
    UndefinedTerm(String),

    /// A proof names a suite that is not registered.
    #[error("unknown proof suite: {0}")]
    UnknownSuite(String),

    /// DID does not conform to `did:<method>:<identifier>`.
    #[error("invalid DID format: \"{0}\" (expected did:<method>:<identifier>)")]
    InvalidDid(String),

    /// Timestamp string is not valid RFC 3339.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Structurally malformed input.
    #[error("malformed input: {0}")]
    Malformed(String),
}

/// Backend failures. Retryable by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The key store could not complete a signing request.
    #[error("signing backend error: {0}")]
    SigningBackend(String),

    /// A registered resolver errored or reported not-found.
    #[error("resolution of {did} failed: {reason}")]
    ResolutionFailed {
        /// The DID being resolved.
        did: String,
        /// Resolver diagnostic.
        reason: String,
    },

    /// The operation exceeded its deadline. No partial state was applied.
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        /// Name of the operation.
        operation: String,
        /// The deadline that elapsed.
        millis: u64,
    },

    /// A persistence backend failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
