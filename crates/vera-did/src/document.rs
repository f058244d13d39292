//! # DID Documents
//!
//! Serde model of a W3C DID document, limited to what the agent reads and
//! publishes: verification methods, the verification relationships that
//! reference them, and services.
//!
//! Key lookup is relationship-aware. A credential proof must reference a
//! method listed under `assertionMethod`; a presentation proof must
//! reference one under `authentication`. A method that exists but is not
//! listed under the requested relationship is rejected.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use vera_core::Did;
use vera_crypto::{decode_base58btc, decode_multikey, Ed25519PublicKey, Multicodec};

use crate::error::DidError;

/// DID core v1 context.
pub const DID_V1_CONTEXT: &str = "https://www.w3.org/ns/did/v1";
/// Ed25519 2020 verification suite context.
pub const ED25519_2020_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";
/// X25519 2020 key agreement suite context.
pub const X25519_2020_CONTEXT: &str = "https://w3id.org/security/suites/x25519-2020/v1";

/// Verification method type for Ed25519 multikeys.
pub const ED25519_VERIFICATION_KEY_2020: &str = "Ed25519VerificationKey2020";
/// Verification method type for X25519 multikeys.
pub const X25519_KEY_AGREEMENT_KEY_2020: &str = "X25519KeyAgreementKey2020";

/// A resolved DID document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// JSON-LD contexts. Accepts a single string on input.
    #[serde(rename = "@context", default, deserialize_with = "one_or_many")]
    pub context: Vec<String>,
    /// The DID this document describes.
    pub id: Did,
    /// Other identifiers for the same subject.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_known_as: Vec<String>,
    /// Declared verification methods.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,
    /// Methods usable to authenticate as the subject (presentations).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<VerificationRelationship>,
    /// Methods usable to issue assertions (credentials, tokens).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<VerificationRelationship>,
    /// Methods usable for key agreement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_agreement: Vec<VerificationRelationship>,
    /// Methods usable to invoke capabilities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_invocation: Vec<VerificationRelationship>,
    /// Methods usable to delegate capabilities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<VerificationRelationship>,
    /// Service endpoints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

/// A verification method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Absolute DID URL of the method.
    pub id: String,
    /// Method type, e.g. `Ed25519VerificationKey2020`.
    #[serde(rename = "type")]
    pub method_type: String,
    /// Controller DID.
    pub controller: String,
    /// Multicodec multibase public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
    /// Raw base58 public key (2018 suites).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,
    /// JWK public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<PublicKeyJwk>,
}

/// The subset of JWK the agent reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyJwk {
    /// Key type; `OKP` for Ed25519.
    pub kty: String,
    /// Curve; `Ed25519`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// Base64url public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
}

/// A relationship entry: a reference to a declared method or an embedded one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerificationRelationship {
    /// DID URL (absolute or `#fragment`).
    Reference(String),
    /// Method defined inline.
    Embedded(VerificationMethod),
}

/// A service endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Service id.
    pub id: String,
    /// Service type.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Endpoint URL or structured endpoint.
    pub service_endpoint: serde_json::Value,
}

/// Verification relationships the agent checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relationship {
    /// `authentication`.
    Authentication,
    /// `assertionMethod`.
    AssertionMethod,
    /// `keyAgreement`.
    KeyAgreement,
}

impl Relationship {
    /// The proof purpose / document property name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::AssertionMethod => "assertionMethod",
            Self::KeyAgreement => "keyAgreement",
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<serde_json::Value>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        // Inline context objects carry no key material; keep only the ids.
        OneOrMany::Many(v) => v
            .into_iter()
            .filter_map(|c| c.as_str().map(str::to_string))
            .collect(),
    })
}

impl DidDocument {
    /// An empty document for `id` with the DID v1 context.
    pub fn new(id: Did) -> Self {
        Self {
            context: vec![DID_V1_CONTEXT.to_string()],
            id,
            also_known_as: Vec::new(),
            verification_method: Vec::new(),
            authentication: Vec::new(),
            assertion_method: Vec::new(),
            key_agreement: Vec::new(),
            capability_invocation: Vec::new(),
            capability_delegation: Vec::new(),
            service: Vec::new(),
        }
    }

    /// Expand `#fragment` references against this document's DID.
    pub fn absolute_id(&self, id: &str) -> String {
        match id.strip_prefix('#') {
            Some(fragment) => self.id.with_fragment(fragment),
            None => id.to_string(),
        }
    }

    fn relationship(&self, rel: Relationship) -> &[VerificationRelationship] {
        match rel {
            Relationship::Authentication => &self.authentication,
            Relationship::AssertionMethod => &self.assertion_method,
            Relationship::KeyAgreement => &self.key_agreement,
        }
    }

    /// Find the method `method_id` if it is authorized for `rel`.
    pub fn authorized_method(
        &self,
        method_id: &str,
        rel: Relationship,
    ) -> Result<&VerificationMethod, DidError> {
        let wanted = self.absolute_id(method_id);
        let not_authorized = || DidError::KeyNotAuthorized {
            method: wanted.clone(),
            relationship: rel.as_str().to_string(),
        };
        for entry in self.relationship(rel) {
            match entry {
                VerificationRelationship::Embedded(vm) if self.absolute_id(&vm.id) == wanted => {
                    return Ok(vm);
                }
                VerificationRelationship::Reference(r) if self.absolute_id(r) == wanted => {
                    return self
                        .verification_method
                        .iter()
                        .find(|vm| self.absolute_id(&vm.id) == wanted)
                        .ok_or_else(not_authorized);
                }
                _ => {}
            }
        }
        Err(not_authorized())
    }

    /// The Ed25519 public key of `method_id`, if authorized for `rel`.
    pub fn ed25519_key_for(
        &self,
        method_id: &str,
        rel: Relationship,
    ) -> Result<Ed25519PublicKey, DidError> {
        self.authorized_method(method_id, rel)?.ed25519_public_key()
    }

    /// Ids of every method listed under `rel`, absolute.
    pub fn method_ids(&self, rel: Relationship) -> Vec<String> {
        self.relationship(rel)
            .iter()
            .map(|entry| match entry {
                VerificationRelationship::Reference(r) => self.absolute_id(r),
                VerificationRelationship::Embedded(vm) => self.absolute_id(&vm.id),
            })
            .collect()
    }
}

impl VerificationMethod {
    /// Decode this method's Ed25519 public key from whichever encoding it
    /// carries.
    pub fn ed25519_public_key(&self) -> Result<Ed25519PublicKey, DidError> {
        let invalid = |m: String| DidError::InvalidDocument(format!("{}: {m}", self.id));

        if let Some(mb) = &self.public_key_multibase {
            return match decode_multikey(mb) {
                Ok((Multicodec::Ed25519Pub, raw)) => Ok(Ed25519PublicKey::from_bytes(raw)),
                Ok((codec, _)) => Err(invalid(format!("expected Ed25519 key, got {codec:?}"))),
                // Some 2018-era documents put an unprefixed key in multibase.
                Err(_) => {
                    let raw = decode_base58btc(mb).map_err(|e| invalid(e.to_string()))?;
                    Ed25519PublicKey::from_slice(&raw).map_err(|e| invalid(e.to_string()))
                }
            };
        }
        if let Some(b58) = &self.public_key_base58 {
            let raw = bs58::decode(b58)
                .into_vec()
                .map_err(|e| invalid(format!("invalid base58: {e}")))?;
            return Ed25519PublicKey::from_slice(&raw).map_err(|e| invalid(e.to_string()));
        }
        if let Some(jwk) = &self.public_key_jwk {
            if jwk.kty != "OKP" || jwk.crv.as_deref() != Some("Ed25519") {
                return Err(invalid(format!("unsupported JWK {}/{:?}", jwk.kty, jwk.crv)));
            }
            let x = jwk.x.as_deref().ok_or_else(|| invalid("JWK has no x".to_string()))?;
            let raw = URL_SAFE_NO_PAD
                .decode(x)
                .map_err(|e| invalid(format!("invalid base64url: {e}")))?;
            return Ed25519PublicKey::from_slice(&raw).map_err(|e| invalid(e.to_string()));
        }
        Err(invalid("no public key material".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vera_crypto::{encode_multikey, Ed25519KeyPair};

    fn doc_with_key() -> (DidDocument, Ed25519PublicKey) {
        let pk = Ed25519KeyPair::generate().public_key();
        let mb = encode_multikey(Multicodec::Ed25519Pub, pk.as_bytes());
        let doc: DidDocument = serde_json::from_value(json!({
            "@context": "https://www.w3.org/ns/did/v1",
            "id": "did:web:example.com",
            "verificationMethod": [{
                "id": "did:web:example.com#owner",
                "type": "Ed25519VerificationKey2020",
                "controller": "did:web:example.com",
                "publicKeyMultibase": mb
            }],
            "assertionMethod": ["#owner"],
            "authentication": [{
                "id": "did:web:example.com#auth",
                "type": "JsonWebKey2020",
                "controller": "did:web:example.com",
                "publicKeyJwk": {"kty": "OKP", "crv": "Ed25519", "x": URL_SAFE_NO_PAD.encode(pk.as_bytes())}
            }]
        }))
        .unwrap();
        (doc, pk)
    }

    #[test]
    fn single_context_string_is_accepted() {
        let (doc, _) = doc_with_key();
        assert_eq!(doc.context, vec![DID_V1_CONTEXT.to_string()]);
    }

    #[test]
    fn relative_reference_resolves_for_assertion() {
        let (doc, pk) = doc_with_key();
        let key = doc
            .ed25519_key_for("did:web:example.com#owner", Relationship::AssertionMethod)
            .unwrap();
        assert_eq!(key, pk);
    }

    #[test]
    fn embedded_jwk_method_resolves_for_authentication() {
        let (doc, pk) = doc_with_key();
        let key = doc.ed25519_key_for("#auth", Relationship::Authentication).unwrap();
        assert_eq!(key, pk);
    }

    #[test]
    fn method_not_listed_under_relationship_is_rejected() {
        let (doc, _) = doc_with_key();
        let err = doc
            .ed25519_key_for("did:web:example.com#owner", Relationship::Authentication)
            .unwrap_err();
        assert!(matches!(err, DidError::KeyNotAuthorized { .. }));
    }

    #[test]
    fn base58_2018_key_decodes() {
        let pk = Ed25519KeyPair::generate().public_key();
        let vm = VerificationMethod {
            id: "did:x:y#k".into(),
            method_type: "Ed25519VerificationKey2018".into(),
            controller: "did:x:y".into(),
            public_key_multibase: None,
            public_key_base58: Some(bs58::encode(pk.as_bytes()).into_string()),
            public_key_jwk: None,
        };
        assert_eq!(vm.ed25519_public_key().unwrap(), pk);
    }

    #[test]
    fn method_without_material_is_invalid() {
        let vm = VerificationMethod {
            id: "did:x:y#k".into(),
            method_type: "Ed25519VerificationKey2020".into(),
            controller: "did:x:y".into(),
            public_key_multibase: None,
            public_key_base58: None,
            public_key_jwk: None,
        };
        assert!(matches!(vm.ed25519_public_key(), Err(DidError::InvalidDocument(_))));
    }
}
