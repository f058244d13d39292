//! # Proof Suites
//!
//! A [`ProofSuite`] turns signing input into a [`Proof`] and back. Suites are
//! stateless: the key comes from a [`Signer`] at issuance and from the
//! resolved DID document at verification.
//!
//! The [`SuiteRegistry`] is closed-world. A proof naming a suite that is not
//! registered cannot be verified, and there is no default suite to fall back
//! on.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use vera_core::{sha256_bytes, CanonicalBytes};
use vera_crypto::Ed25519PublicKey;

use crate::error::VcError;
use crate::proof::{Proof, ProofOptions};

/// Produces signatures for one verification method.
///
/// Implementations route to key custody; the private key never reaches
/// the suite.
#[async_trait]
pub trait Signer: Send + Sync {
    /// DID URL of the key this signer uses.
    fn verification_method(&self) -> &str;

    /// Sign `payload`, returning the raw signature bytes.
    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, VcError>;
}

/// A compact token split into its parts. Nothing about it has been
/// verified yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactToken {
    /// Decoded protected header.
    pub header: Value,
    /// Decoded claims.
    pub claims: Value,
    /// `header.payload` as transmitted.
    pub signing_input: String,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

impl CompactToken {
    /// The `kid` header, naming the verification method.
    pub fn key_id(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }

    /// The `iss` claim.
    pub fn issuer(&self) -> Option<&str> {
        self.claims.get("iss").and_then(Value::as_str)
    }
}

/// A pluggable signature format.
#[async_trait]
pub trait ProofSuite: Send + Sync {
    /// The suite id carried in a proof's `type`.
    fn id(&self) -> &str;

    /// Sign the canonical `document` under `options`.
    async fn issue(
        &self,
        document: &CanonicalBytes,
        options: ProofOptions,
        signer: &dyn Signer,
    ) -> Result<Proof, VcError>;

    /// Check `proof` over the canonical `document` with `key`.
    fn verify(
        &self,
        document: &CanonicalBytes,
        proof: &Proof,
        key: &Ed25519PublicKey,
    ) -> Result<(), VcError>;

    /// The JOSE `alg` this suite uses for compact tokens, if it issues them.
    fn compact_alg(&self) -> Option<&str> {
        None
    }

    /// Sign `claims` as a compact token.
    async fn sign_compact(&self, _claims: &Value, _signer: &dyn Signer) -> Result<String, VcError> {
        Err(VcError::Unsupported {
            suite: self.id().to_string(),
            operation: "sign_compact",
        })
    }

    /// Check a decoded compact token's signature with `key`.
    fn verify_compact(&self, _token: &CompactToken, _key: &Ed25519PublicKey) -> Result<(), VcError> {
        Err(VcError::Unsupported {
            suite: self.id().to_string(),
            operation: "verify_compact",
        })
    }
}

/// The signing input shared by the linked-data suites:
/// `sha256(canonical(proof options)) ‖ sha256(canonical(document))`.
pub(crate) fn linked_data_signing_input(
    proof_type: &str,
    options: &ProofOptions,
    document: &CanonicalBytes,
) -> Result<Vec<u8>, VcError> {
    let unsigned = Proof::unsigned(proof_type, options.clone());
    let options_bytes = CanonicalBytes::new(&unsigned)?;
    let mut input = Vec::with_capacity(64);
    input.extend_from_slice(&sha256_bytes(options_bytes.as_bytes()));
    input.extend_from_slice(&sha256_bytes(document.as_bytes()));
    Ok(input)
}

/// Registered proof suites, by id.
#[derive(Default, Clone)]
pub struct SuiteRegistry {
    suites: BTreeMap<String, Arc<dyn ProofSuite>>,
}

impl SuiteRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `suite`. A second suite with the same id is a configuration
    /// error.
    pub fn register(&mut self, suite: Arc<dyn ProofSuite>) -> Result<(), VcError> {
        let id = suite.id().to_string();
        if self.suites.contains_key(&id) {
            return Err(VcError::DuplicateSuite(id));
        }
        tracing::debug!(suite = %id, "proof suite registered");
        self.suites.insert(id, suite);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, suite: Arc<dyn ProofSuite>) -> Result<Self, VcError> {
        self.register(suite)?;
        Ok(self)
    }

    /// The suite registered as `id`.
    pub fn get(&self, id: &str) -> Result<Arc<dyn ProofSuite>, VcError> {
        self.suites
            .get(id)
            .cloned()
            .ok_or_else(|| VcError::UnknownSuite(id.to_string()))
    }

    /// The first registered suite issuing compact tokens with `alg`.
    pub fn compact(&self, alg: &str) -> Result<Arc<dyn ProofSuite>, VcError> {
        self.suites
            .values()
            .find(|s| s.compact_alg() == Some(alg))
            .cloned()
            .ok_or_else(|| VcError::UnknownSuite(format!("compact alg {alg}")))
    }

    /// Registered suite ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.suites.keys().cloned().collect()
    }
}

impl std::fmt::Debug for SuiteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRegistry").field("suites", &self.ids()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ed25519_2020::Ed25519Signature2020;
    use crate::jws_2020::JsonWebSignature2020;

    #[test]
    fn duplicate_suite_is_rejected() {
        let mut reg = SuiteRegistry::new();
        reg.register(Arc::new(Ed25519Signature2020)).unwrap();
        let err = reg.register(Arc::new(Ed25519Signature2020)).unwrap_err();
        assert!(matches!(err, VcError::DuplicateSuite(id) if id == "Ed25519Signature2020"));
    }

    #[test]
    fn lookup_is_closed_world() {
        let reg = SuiteRegistry::new().with(Arc::new(Ed25519Signature2020)).unwrap();
        assert!(reg.get("Ed25519Signature2020").is_ok());
        assert!(matches!(
            reg.get("JsonWebSignature2020"),
            Err(VcError::UnknownSuite(_))
        ));
        assert!(reg.compact("EdDSA").is_err());
    }

    #[test]
    fn compact_lookup_by_alg() {
        let reg = SuiteRegistry::new()
            .with(Arc::new(Ed25519Signature2020))
            .unwrap()
            .with(Arc::new(JsonWebSignature2020))
            .unwrap();
        assert_eq!(reg.compact("EdDSA").unwrap().id(), "JsonWebSignature2020");
        assert_eq!(reg.ids(), vec!["Ed25519Signature2020", "JsonWebSignature2020"]);
    }
}
