//! # `did:key`
//!
//! The DID *is* the public key: `did:key:` + multibase(multicodec ‖ key).
//! Documents are derived locally and never fetched.

use std::sync::Arc;

use async_trait::async_trait;
use vera_core::{Did, Timestamp};
use vera_crypto::{decode_multikey, Multicodec};
use vera_kms::{KeyKind, KeyManager, KeyPurpose};

use crate::document::{
    DidDocument, VerificationMethod, VerificationRelationship, ED25519_2020_CONTEXT,
    ED25519_VERIFICATION_KEY_2020, X25519_2020_CONTEXT, X25519_KEY_AGREEMENT_KEY_2020,
};
use crate::error::DidError;
use crate::identifier::{CreateIdentifierOptions, Identifier, IdentifierKey};
use crate::manager::DidProvider;
use crate::resolver::DidResolver;

/// Provider name for `did:key`.
pub const KEY_PROVIDER: &str = "did:key";

/// Derive the document of a `did:key` DID.
pub fn key_did_document(did: &Did) -> Result<DidDocument, DidError> {
    let mb = did.method_specific_id();
    let (codec, _) = decode_multikey(mb).map_err(|e| DidError::InvalidDocument(e.to_string()))?;
    let vm_id = did.with_fragment(mb);
    let reference = || vec![VerificationRelationship::Reference(vm_id.clone())];

    let mut doc = DidDocument::new(did.clone());
    match codec {
        Multicodec::Ed25519Pub => {
            doc.context.push(ED25519_2020_CONTEXT.to_string());
            doc.verification_method.push(VerificationMethod {
                id: vm_id.clone(),
                method_type: ED25519_VERIFICATION_KEY_2020.to_string(),
                controller: did.to_string(),
                public_key_multibase: Some(mb.to_string()),
                public_key_base58: None,
                public_key_jwk: None,
            });
            doc.authentication = reference();
            doc.assertion_method = reference();
            doc.capability_invocation = reference();
            doc.capability_delegation = reference();
        }
        Multicodec::X25519Pub => {
            doc.context.push(X25519_2020_CONTEXT.to_string());
            doc.verification_method.push(VerificationMethod {
                id: vm_id.clone(),
                method_type: X25519_KEY_AGREEMENT_KEY_2020.to_string(),
                controller: did.to_string(),
                public_key_multibase: Some(mb.to_string()),
                public_key_base58: None,
                public_key_jwk: None,
            });
            doc.key_agreement = reference();
        }
    }
    Ok(doc)
}

/// Resolves `did:key` DIDs without I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyDidResolver;

#[async_trait]
impl DidResolver for KeyDidResolver {
    fn method(&self) -> &str {
        "key"
    }

    async fn resolve(&self, did: &Did) -> Result<Option<DidDocument>, DidError> {
        key_did_document(did).map(Some)
    }
}

/// Creates `did:key` identifiers from a fresh Ed25519 key.
pub struct KeyDidProvider {
    kms: Arc<KeyManager>,
}

impl KeyDidProvider {
    /// Create a provider minting keys through `kms`.
    pub fn new(kms: Arc<KeyManager>) -> Self {
        Self { kms }
    }
}

#[async_trait]
impl DidProvider for KeyDidProvider {
    fn name(&self) -> &str {
        KEY_PROVIDER
    }

    async fn create(&self, options: &CreateIdentifierOptions) -> Result<Identifier, DidError> {
        let kp = self.kms.create_key_pair(KeyKind::Ed25519).await?;
        let did = Did::new(format!("did:key:{}", kp.public_key.public_key_multibase))?;
        self.kms.bind(&did, &kp.key_id, KeyPurpose::Signing).await?;
        Ok(Identifier {
            controller: did.clone(),
            did,
            keys: vec![IdentifierKey::from_key_pair(&kp, KeyPurpose::Signing)],
            provider: KEY_PROVIDER.to_string(),
            alias: options.alias.clone(),
            created: Timestamp::now(),
        })
    }

    async fn deactivate(&self, _identifier: &Identifier) -> Result<(), DidError> {
        // Nothing is published for did:key.
        Ok(())
    }
}
