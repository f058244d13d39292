//! # Proof objects
//!
//! A [`Proof`] names the suite that produced it in `type`. The suite id is
//! kept as a plain string so a document carrying an unregistered suite can
//! still be parsed and then rejected by the verifier with a reason.

use serde::{Deserialize, Serialize};
use vera_core::Timestamp;

/// Why the proof was made.
///
/// Follows the W3C VC Data Integrity proof purpose vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    /// The issuer asserts the claims. Used for credentials and tokens.
    AssertionMethod,
    /// The holder authenticates. Used for presentations.
    Authentication,
}

impl ProofPurpose {
    /// The JSON-LD name of the purpose.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofPurpose::AssertionMethod => "assertionMethod",
            ProofPurpose::Authentication => "authentication",
        }
    }

    /// The DID document relationship that must authorize the signing key.
    pub fn relationship(&self) -> vera_did::Relationship {
        match self {
            ProofPurpose::AssertionMethod => vera_did::Relationship::AssertionMethod,
            ProofPurpose::Authentication => vera_did::Relationship::Authentication,
        }
    }
}

impl std::fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything about a proof except its signature value.
///
/// Suites sign over these options together with the expanded document, so
/// changing the purpose, the challenge or the verification method after the
/// fact invalidates the proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOptions {
    /// When the proof was created.
    pub created: Timestamp,
    /// DID URL of the signing key.
    pub verification_method: String,
    /// Purpose of the proof.
    pub proof_purpose: ProofPurpose,
    /// Verifier-chosen nonce (presentations).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    /// Intended verifier domain (presentations).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl ProofOptions {
    /// Options for `verification_method` and `purpose`, created now.
    pub fn new(verification_method: impl Into<String>, purpose: ProofPurpose) -> Self {
        Self {
            created: Timestamp::now(),
            verification_method: verification_method.into(),
            proof_purpose: purpose,
            challenge: None,
            domain: None,
        }
    }

    /// Set the presentation challenge.
    pub fn with_challenge(mut self, challenge: impl Into<String>) -> Self {
        self.challenge = Some(challenge.into());
        self
    }
}

/// A proof attached to a credential or presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    /// Suite id, e.g. `Ed25519Signature2020`.
    #[serde(rename = "type")]
    pub proof_type: String,

    /// Proof options covered by the signature.
    #[serde(flatten)]
    pub options: ProofOptions,

    /// Multibase signature (linked-data suites).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,

    /// Detached JWS (JWS suites).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,
}

impl Proof {
    /// The proof with its signature value removed, as it is signed.
    pub fn unsigned(proof_type: impl Into<String>, options: ProofOptions) -> Self {
        Self {
            proof_type: proof_type.into(),
            options,
            proof_value: None,
            jws: None,
        }
    }

    /// Verification method of the proof.
    pub fn verification_method(&self) -> &str {
        &self.options.verification_method
    }

    /// Purpose of the proof.
    pub fn purpose(&self) -> ProofPurpose {
        self.options.proof_purpose
    }

    /// Presentation challenge, if any.
    pub fn challenge(&self) -> Option<&str> {
        self.options.challenge.as_deref()
    }
}
