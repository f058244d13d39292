//! # Credentials and presentations
//!
//! W3C VC Data Model envelopes. A payload type ([`CredentialPayload`],
//! [`PresentationPayload`]) is the unsigned document; the verifiable type
//! flattens the payload and adds one [`Proof`].
//!
//! Unrecognised top-level members are kept in `extensions` so that they are
//! covered by the signature and must be defined by the document's contexts.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use vera_core::{Did, Timestamp};

use crate::context::CREDENTIALS_V1_CONTEXT;
use crate::proof::Proof;

/// Base type of every credential.
pub const VERIFIABLE_CREDENTIAL: &str = "VerifiableCredential";
/// Base type of every presentation.
pub const VERIFIABLE_PRESENTATION: &str = "VerifiablePresentation";

/// An unsigned credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPayload {
    /// Context ids or inline context objects, in order.
    #[serde(rename = "@context", deserialize_with = "one_or_many")]
    pub context: Vec<Value>,

    /// Credential id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Types. Includes `VerifiableCredential`.
    #[serde(rename = "type", deserialize_with = "one_or_many")]
    pub credential_type: Vec<String>,

    /// Issuing DID.
    pub issuer: Did,

    /// Issuance time.
    pub issuance_date: Timestamp,

    /// Optional expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<Timestamp>,

    /// The claims.
    pub credential_subject: Value,

    /// Other members (`credentialStatus`, `evidence`, ...).
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl CredentialPayload {
    /// A credential from `issuer` about `subject`, issued now, with the W3C
    /// credentials context and the base type.
    pub fn new(issuer: Did, subject: Value) -> Self {
        Self {
            context: vec![Value::String(CREDENTIALS_V1_CONTEXT.to_string())],
            id: None,
            credential_type: vec![VERIFIABLE_CREDENTIAL.to_string()],
            issuer,
            issuance_date: Timestamp::now(),
            expiration_date: None,
            credential_subject: subject,
            extensions: BTreeMap::new(),
        }
    }

    /// Append a context id or inline context.
    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Append a type.
    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.credential_type.push(ty.into());
        self
    }

    /// Set the expiry.
    pub fn expires(mut self, at: Timestamp) -> Self {
        self.expiration_date = Some(at);
        self
    }
}

/// A credential with its proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiableCredential {
    /// The signed document.
    #[serde(flatten)]
    pub credential: CredentialPayload,
    /// The proof over it.
    pub proof: Proof,
}

impl VerifiableCredential {
    /// Issuing DID.
    pub fn issuer(&self) -> &Did {
        &self.credential.issuer
    }

    /// Whether the credential has expired at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.credential.expiration_date.is_some_and(|exp| exp < now)
    }
}

/// An unsigned presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationPayload {
    /// Context ids or inline context objects, in order.
    #[serde(rename = "@context", deserialize_with = "one_or_many")]
    pub context: Vec<Value>,

    /// Presentation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Types. Includes `VerifiablePresentation`.
    #[serde(rename = "type", deserialize_with = "one_or_many")]
    pub presentation_type: Vec<String>,

    /// Presenting DID.
    pub holder: Did,

    /// Wrapped credentials, possibly none.
    #[serde(default)]
    pub verifiable_credential: Vec<VerifiableCredential>,
}

impl PresentationPayload {
    /// A presentation by `holder` of `credentials`.
    pub fn new(holder: Did, credentials: Vec<VerifiableCredential>) -> Self {
        Self {
            context: vec![Value::String(CREDENTIALS_V1_CONTEXT.to_string())],
            id: None,
            presentation_type: vec![VERIFIABLE_PRESENTATION.to_string()],
            holder,
            verifiable_credential: credentials,
        }
    }
}

/// A presentation with its proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiablePresentation {
    /// The signed document.
    #[serde(flatten)]
    pub presentation: PresentationPayload,
    /// The holder's proof over it.
    pub proof: Proof,
}

impl VerifiablePresentation {
    /// Presenting DID.
    pub fn holder(&self) -> &Did {
        &self.presentation.holder
    }
}

/// Accept either a single item or an array for JSON-LD members that allow
/// both.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(v) => v,
        OneOrMany::One(t) => vec![t],
    })
}
