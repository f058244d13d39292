//! # `did:web` Document Publication
//!
//! Builds the document a host serves at `/.well-known/did.json`. The
//! hostname comes from an explicit [`PublicationConfig`]; nothing here reads
//! ambient state. The host owns the HTTP route.
//!
//! When the managed identifier is not itself the `did:web` DID of the host
//! (for example a `did:key` issuer), the published document lists the
//! identifier under `alsoKnownAs` and carries the same keys.

use serde::{Deserialize, Serialize};
use vera_kms::{KeyKind, KeyPair};

use crate::document::{
    DidDocument, Service, VerificationMethod, VerificationRelationship, ED25519_2020_CONTEXT,
    ED25519_VERIFICATION_KEY_2020, X25519_2020_CONTEXT, X25519_KEY_AGREEMENT_KEY_2020,
};
use crate::error::DidError;
use crate::identifier::Identifier;
use crate::web::web_did;

/// Where the document is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationConfig {
    /// Public hostname (optionally `host:port`) of the agent.
    pub hostname: String,
}

/// Build the `did:web` document for `identifier` under `config.hostname`.
///
/// Signing keys are published under `authentication` and `assertionMethod`,
/// and `encryption_key` (if any) under `keyAgreement`. A DIDComm messaging
/// service pointing at `https://<hostname>/didcomm` is included.
pub fn web_did_document(
    identifier: &Identifier,
    encryption_key: Option<&KeyPair>,
    config: &PublicationConfig,
) -> Result<DidDocument, DidError> {
    let did = web_did(&config.hostname, None)?;
    let mut doc = DidDocument::new(did.clone());
    doc.context.push(ED25519_2020_CONTEXT.to_string());
    if identifier.did != did {
        doc.also_known_as.push(identifier.did.to_string());
    }

    for key in identifier.keys.iter().filter(|k| k.kind == KeyKind::Ed25519) {
        let id = did.with_fragment(&key.public_key_multibase);
        doc.verification_method.push(VerificationMethod {
            id: id.clone(),
            method_type: ED25519_VERIFICATION_KEY_2020.to_string(),
            controller: did.to_string(),
            public_key_multibase: Some(key.public_key_multibase.clone()),
            public_key_base58: None,
            public_key_jwk: None,
        });
        doc.authentication.push(VerificationRelationship::Reference(id.clone()));
        doc.assertion_method.push(VerificationRelationship::Reference(id));
    }

    if let Some(kp) = encryption_key {
        if kp.kind != KeyKind::X25519 {
            return Err(DidError::InvalidDocument(format!(
                "encryption key {} must be X25519, got {}",
                kp.key_id, kp.kind
            )));
        }
        doc.context.push(X25519_2020_CONTEXT.to_string());
        let id = did.with_fragment(&kp.public_key.public_key_multibase);
        doc.verification_method.push(VerificationMethod {
            id: id.clone(),
            method_type: X25519_KEY_AGREEMENT_KEY_2020.to_string(),
            controller: did.to_string(),
            public_key_multibase: Some(kp.public_key.public_key_multibase.clone()),
            public_key_base58: None,
            public_key_jwk: None,
        });
        doc.key_agreement.push(VerificationRelationship::Reference(id));
    }

    doc.service.push(Service {
        id: did.with_fragment("didcomm"),
        service_type: "DIDCommMessaging".to_string(),
        service_endpoint: serde_json::Value::String(format!("https://{}/didcomm", config.hostname)),
    });
    Ok(doc)
}
