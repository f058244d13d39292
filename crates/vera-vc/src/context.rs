//! # Context Registry
//!
//! Resolves the `@context` of a credential or presentation and expands
//! every member name to an absolute IRI before canonicalization.
//!
//! ## Security Invariant
//!
//! Expansion fails closed. A context id that is not registered yields
//! [`VcError::UnknownContext`] and a term that no active context defines
//! yields [`VcError::UndefinedTerm`]. Silently dropping either would let two
//! documents with different meaning produce the same signing input.
//!
//! ## Expansion rules
//!
//! - Keywords (`@id`, `@type`, ...) pass through. `id` and `type` are
//!   aliases for `@id` and `@type`.
//! - A term maps to the IRI its context gives it, or to `@vocab` + term
//!   when a context sets a vocabulary.
//! - Names that already contain `:` are treated as IRIs.
//! - `@type` values are expanded like terms. `@id` values are left alone.
//! - A nested `@context` extends the active context for that subtree.
//! - Two members that expand to the same IRI in one object are rejected.

use std::collections::HashMap;

use serde_json::{Map, Value};
use vera_core::CanonicalBytes;

use crate::error::VcError;

/// W3C credentials v1.
pub const CREDENTIALS_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
/// Ed25519Signature2020 suite context.
pub const ED25519_2020_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";
/// JsonWebSignature2020 suite context.
pub const JWS_2020_CONTEXT: &str = "https://w3id.org/security/suites/jws-2020/v1";
/// W3C DID core v1.
pub const DID_V1_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

const CRED: &str = "https://www.w3.org/2018/credentials#";
const SEC: &str = "https://w3id.org/security#";

/// Term definitions of one context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextDefinition {
    terms: HashMap<String, String>,
    vocab: Option<String>,
}

impl ContextDefinition {
    /// Parse an inline context object. Term values are IRIs or
    /// `{"@id": iri}` objects; `null` undefines a term.
    pub fn from_json(value: &Value) -> Result<Self, VcError> {
        let obj = value
            .as_object()
            .ok_or_else(|| VcError::Malformed("context definition must be an object".into()))?;
        let mut def = Self::default();
        for (term, target) in obj {
            match (term.as_str(), target) {
                ("@vocab", Value::String(iri)) => def.vocab = Some(iri.clone()),
                ("@vocab", Value::Null) => def.vocab = None,
                (t, _) if t.starts_with('@') => {}
                (_, Value::String(iri)) => {
                    def.terms.insert(term.clone(), iri.clone());
                }
                (_, Value::Object(o)) => {
                    let iri = o.get("@id").and_then(Value::as_str).ok_or_else(|| {
                        VcError::Malformed(format!("term \"{term}\" has no @id"))
                    })?;
                    def.terms.insert(term.clone(), iri.to_string());
                }
                (_, Value::Null) => {
                    def.terms.remove(term);
                }
                _ => {
                    return Err(VcError::Malformed(format!(
                        "term \"{term}\" has an unsupported definition"
                    )))
                }
            }
        }
        Ok(def)
    }

    fn from_pairs(base: &str, names: &[&str]) -> Self {
        Self {
            terms: names
                .iter()
                .map(|n| (n.to_string(), format!("{base}{n}")))
                .collect(),
            vocab: None,
        }
    }

    fn with(mut self, term: &str, iri: &str) -> Self {
        self.terms.insert(term.to_string(), iri.to_string());
        self
    }
}

fn credentials_v1() -> ContextDefinition {
    ContextDefinition::from_pairs(
        CRED,
        &[
            "VerifiableCredential",
            "VerifiablePresentation",
            "credentialSubject",
            "credentialStatus",
            "credentialSchema",
            "evidence",
            "expirationDate",
            "holder",
            "issuanceDate",
            "issuer",
            "refreshService",
            "termsOfUse",
            "verifiableCredential",
        ],
    )
    .with("id", "@id")
    .with("type", "@type")
    .with("proof", &format!("{SEC}proof"))
    .with("created", "http://purl.org/dc/terms/created")
    .with("verificationMethod", &format!("{SEC}verificationMethod"))
    .with("proofPurpose", &format!("{SEC}proofPurpose"))
    .with("proofValue", &format!("{SEC}proofValue"))
    .with("challenge", &format!("{SEC}challenge"))
    .with("domain", &format!("{SEC}domain"))
    .with("jws", &format!("{SEC}jws"))
}

fn ed25519_2020() -> ContextDefinition {
    ContextDefinition::from_pairs(
        SEC,
        &[
            "Ed25519Signature2020",
            "Ed25519VerificationKey2020",
            "publicKeyMultibase",
            "proofValue",
            "verificationMethod",
            "proofPurpose",
            "challenge",
            "domain",
        ],
    )
    .with("id", "@id")
    .with("type", "@type")
    .with("created", "http://purl.org/dc/terms/created")
}

fn jws_2020() -> ContextDefinition {
    ContextDefinition::from_pairs(
        SEC,
        &[
            "JsonWebSignature2020",
            "JsonWebKey2020",
            "publicKeyJwk",
            "jws",
            "verificationMethod",
            "proofPurpose",
            "challenge",
            "domain",
        ],
    )
    .with("id", "@id")
    .with("type", "@type")
    .with("created", "http://purl.org/dc/terms/created")
}

fn did_v1() -> ContextDefinition {
    ContextDefinition::from_pairs(
        SEC,
        &[
            "assertionMethod",
            "authentication",
            "capabilityDelegation",
            "capabilityInvocation",
            "controller",
            "keyAgreement",
            "verificationMethod",
        ],
    )
    .with("id", "@id")
    .with("type", "@type")
    .with("alsoKnownAs", "https://www.w3.org/ns/activitystreams#alsoKnownAs")
    .with("service", "https://www.w3.org/ns/did#service")
    .with("serviceEndpoint", "https://www.w3.org/ns/did#serviceEndpoint")
}

/// Registered context maps, looked up by id.
#[derive(Debug, Clone)]
pub struct ContextRegistry {
    contexts: HashMap<String, ContextDefinition>,
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextRegistry {
    /// A registry holding the built-in contexts: W3C credentials v1, the
    /// Ed25519 2020 and JWS 2020 suite contexts, and DID v1.
    pub fn new() -> Self {
        let mut contexts = HashMap::new();
        contexts.insert(CREDENTIALS_V1_CONTEXT.to_string(), credentials_v1());
        contexts.insert(ED25519_2020_CONTEXT.to_string(), ed25519_2020());
        contexts.insert(JWS_2020_CONTEXT.to_string(), jws_2020());
        contexts.insert(DID_V1_CONTEXT.to_string(), did_v1());
        Self { contexts }
    }

    /// Register a local context under `id`, replacing any earlier one.
    pub fn register(&mut self, id: impl Into<String>, definition: &Value) -> Result<(), VcError> {
        let id = id.into();
        let def = ContextDefinition::from_json(definition)?;
        tracing::debug!(context = %id, terms = def.terms.len(), "context registered");
        self.contexts.insert(id, def);
        Ok(())
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.contexts.contains_key(id)
    }

    /// Expand `document` to IRI-keyed form. The top-level `@context` is
    /// consumed and does not appear in the output.
    pub fn expand(&self, document: &Value) -> Result<Value, VcError> {
        self.expand_value(document, &ActiveContext::default())
    }

    /// Expand `document` and canonicalize the result. This is the document
    /// half of every proof's signing input.
    pub fn canonical(&self, document: &Value) -> Result<CanonicalBytes, VcError> {
        Ok(CanonicalBytes::from_value(self.expand(document)?)?)
    }

    fn expand_value(&self, value: &Value, active: &ActiveContext) -> Result<Value, VcError> {
        match value {
            Value::Object(map) => self.expand_object(map, active),
            Value::Array(items) => items
                .iter()
                .map(|v| self.expand_value(v, active))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn expand_object(&self, map: &Map<String, Value>, parent: &ActiveContext) -> Result<Value, VcError> {
        let local;
        let active = match map.get("@context") {
            Some(ctx) => {
                local = parent.extend(self, ctx)?;
                &local
            }
            None => parent,
        };

        let mut out = Map::new();
        for (key, value) in map {
            if key == "@context" {
                continue;
            }
            let iri = active.expand_key(key)?;
            let expanded = match iri.as_str() {
                "@type" => active.expand_types(value)?,
                "@id" => value.clone(),
                _ => self.expand_value(value, active)?,
            };
            if out.insert(iri.clone(), expanded).is_some() {
                return Err(VcError::Malformed(format!(
                    "more than one member expands to {iri}"
                )));
            }
        }
        Ok(Value::Object(out))
    }
}

#[derive(Debug, Clone, Default)]
struct ActiveContext {
    terms: HashMap<String, String>,
    vocab: Option<String>,
}

impl ActiveContext {
    fn extend(&self, registry: &ContextRegistry, ctx: &Value) -> Result<Self, VcError> {
        let mut next = self.clone();
        let entries = match ctx {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            single => vec![single],
        };
        for entry in entries {
            let owned;
            let def = match entry {
                Value::String(id) => registry
                    .contexts
                    .get(id)
                    .ok_or_else(|| VcError::UnknownContext(id.clone()))?,
                Value::Object(_) => {
                    owned = ContextDefinition::from_json(entry)?;
                    &owned
                }
                Value::Null => {
                    next = Self::default();
                    continue;
                }
                other => {
                    return Err(VcError::Malformed(format!("invalid @context entry: {other}")))
                }
            };
            next.apply(def, entry);
        }
        Ok(next)
    }

    fn apply(&mut self, def: &ContextDefinition, raw: &Value) {
        self.terms
            .extend(def.terms.iter().map(|(k, v)| (k.clone(), v.clone())));
        if def.vocab.is_some() {
            self.vocab = def.vocab.clone();
        }
        // `null` entries in an inline context undefine inherited terms.
        if let Value::Object(obj) = raw {
            for (term, target) in obj {
                if target.is_null() {
                    if term == "@vocab" {
                        self.vocab = None;
                    } else {
                        self.terms.remove(term);
                    }
                }
            }
        }
    }

    fn expand_term(&self, term: &str) -> Result<String, VcError> {
        if let Some(iri) = self.terms.get(term) {
            return Ok(iri.clone());
        }
        if term.contains(':') {
            return Ok(term.to_string());
        }
        match &self.vocab {
            Some(vocab) => Ok(format!("{vocab}{term}")),
            None => Err(VcError::UndefinedTerm(term.to_string())),
        }
    }

    fn expand_key(&self, key: &str) -> Result<String, VcError> {
        if key.starts_with('@') {
            return Ok(key.to_string());
        }
        self.expand_term(key)
    }

    fn expand_types(&self, value: &Value) -> Result<Value, VcError> {
        match value {
            Value::String(t) => Ok(Value::String(self.expand_term(t)?)),
            Value::Array(items) => items
                .iter()
                .map(|t| match t {
                    Value::String(t) => self.expand_term(t).map(Value::String),
                    other => Err(VcError::Malformed(format!("invalid type value: {other}"))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(VcError::Malformed(format!("invalid type value: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vc(subject: Value, extra_ctx: Option<Value>) -> Value {
        let mut ctx = vec![json!(CREDENTIALS_V1_CONTEXT)];
        ctx.extend(extra_ctx);
        json!({
            "@context": ctx,
            "type": ["VerifiableCredential"],
            "issuer": "did:key:z6MkIssuer",
            "issuanceDate": "2024-01-15T12:00:00Z",
            "credentialSubject": subject
        })
    }

    #[test]
    fn expands_builtin_terms() {
        let reg = ContextRegistry::new();
        let out = reg.expand(&vc(json!({"id": "did:key:z6MkSubject"}), None)).unwrap();
        assert_eq!(out["@type"], json!([format!("{CRED}VerifiableCredential")]));
        assert_eq!(out[format!("{CRED}issuer")], "did:key:z6MkIssuer");
        assert_eq!(
            out[format!("{CRED}credentialSubject")]["@id"],
            "did:key:z6MkSubject"
        );
        assert!(out.get("@context").is_none());
    }

    #[test]
    fn undefined_claim_fails_closed() {
        let reg = ContextRegistry::new();
        let err = reg.expand(&vc(json!({"name": "Alice"}), None)).unwrap_err();
        assert!(matches!(err, VcError::UndefinedTerm(t) if t == "name"));
    }

    #[test]
    fn unknown_context_fails_closed() {
        let reg = ContextRegistry::new();
        let doc = vc(json!({}), Some(json!("https://unregistered.example/v1")));
        let err = reg.expand(&doc).unwrap_err();
        assert!(matches!(err, VcError::UnknownContext(c) if c == "https://unregistered.example/v1"));
    }

    #[test]
    fn registered_and_inline_contexts_define_terms() {
        let mut reg = ContextRegistry::new();
        reg.register(
            "https://vera.example/profile/v1",
            &json!({"name": "https://schema.org/name"}),
        )
        .unwrap();
        let registered = vc(json!({"name": "Alice"}), Some(json!("https://vera.example/profile/v1")));
        let inline = vc(json!({"name": "Alice"}), Some(json!({"name": {"@id": "https://schema.org/name"}})));

        let a = reg.canonical(&registered).unwrap();
        let b = reg.canonical(&inline).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_meanings_do_not_collide() {
        let reg = ContextRegistry::new();
        let a = vc(json!({"name": "Alice"}), Some(json!({"name": "https://schema.org/name"})));
        let b = vc(json!({"name": "Alice"}), Some(json!({"name": "https://evil.example/name"})));
        assert_ne!(reg.canonical(&a).unwrap(), reg.canonical(&b).unwrap());
    }

    #[test]
    fn vocab_covers_remaining_terms() {
        let reg = ContextRegistry::new();
        let doc = vc(
            json!({"degree": {"type": "BachelorDegree"}}),
            Some(json!({"@vocab": "https://vera.example/vocab#"})),
        );
        let out = reg.expand(&doc).unwrap();
        let subject = &out[format!("{CRED}credentialSubject")];
        assert_eq!(
            subject["https://vera.example/vocab#degree"]["@type"],
            "https://vera.example/vocab#BachelorDegree"
        );
    }

    #[test]
    fn nested_null_context_resets_terms() {
        let reg = ContextRegistry::new();
        let doc = vc(json!({"@context": null, "issuer": "x"}), None);
        let err = reg.expand(&doc).unwrap_err();
        assert!(matches!(err, VcError::UndefinedTerm(t) if t == "issuer"));
    }

    #[test]
    fn aliased_collision_is_rejected() {
        let reg = ContextRegistry::new();
        let doc = json!({
            "@context": [CREDENTIALS_V1_CONTEXT, {"also": format!("{CRED}issuer")}],
            "issuer": "did:key:a",
            "also": "did:key:b"
        });
        assert!(matches!(reg.expand(&doc), Err(VcError::Malformed(_))));
    }
}
