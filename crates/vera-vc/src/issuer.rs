//! # Credential Issuer / Verifier
//!
//! Issuance looks up the suite, then the issuing identifier and its signing
//! key, expands the document's contexts, and hands the canonical bytes to
//! the suite with a key-custody [`Signer`](crate::Signer).
//!
//! ## Verification is data
//!
//! `verify_*` never return an error. Every failure (unresolvable signer,
//! unknown suite, unknown context, undefined term, key not authorized for the
//! proof purpose, bad signature, expiry, challenge mismatch) is reported as
//! `verified: false` with a reason.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use subtle::ConstantTimeEq;
use vera_core::{split_did_url, Did, Timestamp};
use vera_did::{IdentifierManager, Relationship, ResolverRegistry};
use vera_kms::KeyManager;

use crate::context::ContextRegistry;
use crate::credential::{
    CredentialPayload, PresentationPayload, VerifiableCredential, VerifiablePresentation,
};
use crate::error::VcError;
use crate::jws_2020::decode_compact;
use crate::proof::{Proof, ProofOptions, ProofPurpose};
use crate::signer::KmsSigner;
use crate::suite::{Signer, SuiteRegistry};

/// Outcome of verifying a credential or presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether every check passed.
    pub verified: bool,
    /// Why verification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VerificationResult {
    /// A passing result.
    pub fn ok() -> Self {
        Self {
            verified: true,
            reason: None,
        }
    }

    /// A failing result.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            verified: false,
            reason: Some(reason.into()),
        }
    }
}

/// Outcome of verifying a compact token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenVerification {
    /// Whether the signature and expiry checked out.
    pub verified: bool,
    /// Why verification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The `iss` DID, when verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Did>,
    /// The token claims, when verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Value>,
}

impl TokenVerification {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            verified: false,
            reason: Some(reason.into()),
            issuer: None,
            claims: None,
        }
    }
}

/// Issues and verifies credentials, presentations and compact tokens.
pub struct CredentialIssuer {
    identifiers: Arc<IdentifierManager>,
    kms: Arc<KeyManager>,
    resolver: Arc<ResolverRegistry>,
    contexts: ContextRegistry,
    suites: SuiteRegistry,
}

impl CredentialIssuer {
    /// An issuer over the given collaborators with the built-in contexts.
    pub fn new(
        identifiers: Arc<IdentifierManager>,
        kms: Arc<KeyManager>,
        resolver: Arc<ResolverRegistry>,
        suites: SuiteRegistry,
    ) -> Self {
        Self {
            identifiers,
            kms,
            resolver,
            contexts: ContextRegistry::new(),
            suites,
        }
    }

    /// Replace the context registry.
    pub fn with_contexts(mut self, contexts: ContextRegistry) -> Self {
        self.contexts = contexts;
        self
    }

    /// The registered suites.
    pub fn suites(&self) -> &SuiteRegistry {
        &self.suites
    }

    /// The context registry.
    pub fn contexts(&self) -> &ContextRegistry {
        &self.contexts
    }

    async fn signer_for(&self, did: &Did) -> Result<KmsSigner, VcError> {
        let identifier = self.identifiers.issuer(did).await?;
        let key = identifier
            .signing_key()
            .ok_or_else(|| VcError::NoSigningKey(did.to_string()))?;
        Ok(KmsSigner::new(
            self.kms.clone(),
            key.key_id.clone(),
            identifier.verification_method_id(key),
        ))
    }

    /// Sign `payload` as its issuer with the suite `suite_id`.
    pub async fn create_verifiable_credential(
        &self,
        payload: CredentialPayload,
        suite_id: &str,
    ) -> Result<VerifiableCredential, VcError> {
        let suite = self.suites.get(suite_id)?;
        let signer = self.signer_for(&payload.issuer).await?;
        let canonical = self.contexts.canonical(&serde_json::to_value(&payload)?)?;
        let options = ProofOptions::new(signer.verification_method(), ProofPurpose::AssertionMethod);
        let proof = suite.issue(&canonical, options, &signer).await?;
        tracing::info!(issuer = %payload.issuer, suite = suite_id, "credential issued");
        Ok(VerifiableCredential {
            credential: payload,
            proof,
        })
    }

    /// Sign `payload` as its holder, binding it to `challenge`.
    pub async fn create_verifiable_presentation(
        &self,
        payload: PresentationPayload,
        challenge: Option<&str>,
        suite_id: &str,
    ) -> Result<VerifiablePresentation, VcError> {
        let suite = self.suites.get(suite_id)?;
        let signer = self.signer_for(&payload.holder).await?;
        let canonical = self.contexts.canonical(&serde_json::to_value(&payload)?)?;
        let mut options = ProofOptions::new(signer.verification_method(), ProofPurpose::Authentication);
        options.challenge = challenge.map(str::to_string);
        let proof = suite.issue(&canonical, options, &signer).await?;
        tracing::info!(
            holder = %payload.holder,
            credentials = payload.verifiable_credential.len(),
            suite = suite_id,
            "presentation issued"
        );
        Ok(VerifiablePresentation {
            presentation: payload,
            proof,
        })
    }

    /// Verify a credential against its issuer's current DID document.
    pub async fn verify_credential(&self, vc: &VerifiableCredential) -> VerificationResult {
        match self.check_credential(vc).await {
            Ok(()) => VerificationResult::ok(),
            Err(e) => {
                tracing::debug!(issuer = %vc.issuer(), error = %e, "credential failed verification");
                VerificationResult::failed(e.to_string())
            }
        }
    }

    /// Verify a presentation, its holder proof and every embedded
    /// credential. With `Some(challenge)` the proof's challenge must match
    /// it exactly.
    pub async fn verify_presentation(
        &self,
        vp: &VerifiablePresentation,
        challenge: Option<&str>,
    ) -> VerificationResult {
        match self.check_presentation(vp, challenge).await {
            Ok(()) => VerificationResult::ok(),
            Err(e) => {
                tracing::debug!(holder = %vp.holder(), error = %e, "presentation failed verification");
                VerificationResult::failed(e.to_string())
            }
        }
    }

    async fn check_credential(&self, vc: &VerifiableCredential) -> Result<(), VcError> {
        if let Some(exp) = vc.credential.expiration_date {
            if vc.is_expired_at(Timestamp::now()) {
                return Err(VcError::ProofInvalid(format!("credential expired at {exp}")));
            }
        }
        let document = serde_json::to_value(&vc.credential)?;
        self.check_proof(&document, &vc.proof, vc.issuer(), ProofPurpose::AssertionMethod)
            .await
    }

    async fn check_presentation(
        &self,
        vp: &VerifiablePresentation,
        challenge: Option<&str>,
    ) -> Result<(), VcError> {
        if let Some(expected) = challenge {
            let got = vp
                .proof
                .challenge()
                .ok_or_else(|| VcError::ProofInvalid("presentation has no challenge".into()))?;
            if !bool::from(got.as_bytes().ct_eq(expected.as_bytes())) {
                return Err(VcError::ProofInvalid("challenge mismatch".into()));
            }
        }
        let document = serde_json::to_value(&vp.presentation)?;
        self.check_proof(&document, &vp.proof, vp.holder(), ProofPurpose::Authentication)
            .await?;
        for (i, vc) in vp.presentation.verifiable_credential.iter().enumerate() {
            self.check_credential(vc)
                .await
                .map_err(|e| VcError::ProofInvalid(format!("credential {i}: {e}")))?;
        }
        Ok(())
    }

    async fn check_proof(
        &self,
        document: &Value,
        proof: &Proof,
        signer: &Did,
        purpose: ProofPurpose,
    ) -> Result<(), VcError> {
        let suite = self.suites.get(&proof.proof_type)?;
        if proof.purpose() != purpose {
            return Err(VcError::ProofInvalid(format!(
                "proof purpose is {}, expected {purpose}",
                proof.purpose()
            )));
        }
        let (vm_did, _) = split_did_url(proof.verification_method())
            .map_err(|e| VcError::ProofInvalid(e.to_string()))?;
        if vm_did != *signer {
            return Err(VcError::ProofInvalid(format!(
                "verification method {} does not belong to {signer}",
                proof.verification_method()
            )));
        }
        let doc = self.resolver.resolve(signer).await?;
        let key = doc.ed25519_key_for(proof.verification_method(), purpose.relationship())?;
        let canonical = self.contexts.canonical(document)?;
        suite.verify(&canonical, proof, &key)
    }

    /// Sign `claims` as a compact token from `issuer`. `iss` is set to the
    /// issuer and `iat` to now unless the caller supplied one.
    pub async fn create_signed_token(
        &self,
        claims: Value,
        issuer: &Did,
        suite_id: &str,
    ) -> Result<String, VcError> {
        let suite = self.suites.get(suite_id)?;
        let Value::Object(mut map) = claims else {
            return Err(VcError::Malformed("token claims must be an object".into()));
        };
        map.insert("iss".into(), Value::String(issuer.to_string()));
        map.entry("iat")
            .or_insert_with(|| Value::from(Timestamp::now().unix()));
        let signer = self.signer_for(issuer).await?;
        let token = suite.sign_compact(&Value::Object(map), &signer).await?;
        tracing::debug!(%issuer, suite = suite_id, "signed token issued");
        Ok(token)
    }

    /// Verify a compact token against its issuer's DID document.
    pub async fn verify_signed_token(&self, token: &str) -> TokenVerification {
        match self.check_token(token).await {
            Ok((issuer, claims)) => TokenVerification {
                verified: true,
                reason: None,
                issuer: Some(issuer),
                claims: Some(claims),
            },
            Err(e) => {
                tracing::debug!(error = %e, "token failed verification");
                TokenVerification::failed(e.to_string())
            }
        }
    }

    async fn check_token(&self, token: &str) -> Result<(Did, Value), VcError> {
        let decoded = decode_compact(token.trim())?;
        let alg = decoded
            .header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| VcError::Malformed("token header has no alg".into()))?;
        let suite = self.suites.compact(alg)?;
        let iss = decoded
            .issuer()
            .ok_or_else(|| VcError::ProofInvalid("token has no iss".into()))?;
        let issuer = Did::new(iss).map_err(|e| VcError::ProofInvalid(e.to_string()))?;
        let doc = self.resolver.resolve(&issuer).await?;

        let candidates = match decoded.key_id() {
            Some(kid) => {
                let (kid_did, _) =
                    split_did_url(kid).map_err(|e| VcError::ProofInvalid(e.to_string()))?;
                if kid_did != issuer {
                    return Err(VcError::ProofInvalid(format!("kid {kid} does not belong to {issuer}")));
                }
                vec![kid.to_string()]
            }
            None => doc.method_ids(Relationship::AssertionMethod),
        };

        let mut last = VcError::ProofInvalid(format!("{issuer} has no assertion method"));
        let mut verified = false;
        for method in &candidates {
            let attempt = doc
                .ed25519_key_for(method, Relationship::AssertionMethod)
                .map_err(VcError::from)
                .and_then(|key| suite.verify_compact(&decoded, &key));
            match attempt {
                Ok(()) => {
                    verified = true;
                    break;
                }
                Err(e) => last = e,
            }
        }
        if !verified {
            return Err(last);
        }

        if let Some(exp) = decoded.claims.get("exp").and_then(Value::as_i64) {
            if exp < Timestamp::now().unix() {
                return Err(VcError::ProofInvalid("token expired".into()));
            }
        }
        Ok((issuer, decoded.claims))
    }
}

impl std::fmt::Debug for CredentialIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialIssuer")
            .field("suites", &self.suites)
            .field("resolver", &self.resolver)
            .finish()
    }
}
