//! # Classification and validation
//!
//! Recognised payload shapes:
//!
//! | Shape | Example | Result |
//! |-------|---------|--------|
//! | compact JWS | `eyJ...eyJ...sig` | SDR token |
//! | envelope | `{"tag": "abc", "body": <VC, VP or JWS>}` | body, tagged |
//! | bare JSON | a credential or presentation object | untagged |
//!
//! For an enveloped presentation the tag is the challenge the verifier
//! expects; a bare presentation is tagged with its own proof challenge.

use std::sync::Arc;

use serde_json::Value;
use vera_core::Timestamp;
use vera_sdr::{SdrRequest, SDR_TYPE};
use vera_vc::{
    looks_compact, CredentialIssuer, VerifiableCredential, VerifiablePresentation,
    VERIFIABLE_CREDENTIAL, VERIFIABLE_PRESENTATION,
};

use crate::error::MessageError;
use crate::message::{Message, MessageType};

#[derive(Debug)]
enum Body {
    Token(String),
    Credential(Box<VerifiableCredential>),
    Presentation(Box<VerifiablePresentation>),
}

#[derive(Debug)]
struct Classified {
    tag: Option<String>,
    body: Body,
}

fn has_type(doc: &Value, wanted: &str) -> bool {
    match doc.get("type") {
        Some(Value::String(t)) => t == wanted,
        Some(Value::Array(ts)) => ts.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

fn classify_value(value: Value, tag: Option<String>) -> Result<Classified, MessageError> {
    match value {
        Value::String(s) if looks_compact(&s) => Ok(Classified {
            tag,
            body: Body::Token(s.trim().to_string()),
        }),
        Value::Object(ref obj) if obj.contains_key("body") && tag.is_none() => {
            let tag = match obj.get("tag") {
                Some(Value::String(t)) => Some(t.clone()),
                None | Some(Value::Null) => None,
                Some(other) => {
                    return Err(MessageError::UnsupportedPayload(format!(
                        "envelope tag must be a string, got {other}"
                    )))
                }
            };
            let body = obj.get("body").cloned().unwrap_or(Value::Null);
            if body.get("body").is_some() {
                return Err(MessageError::UnsupportedPayload("nested envelope".into()));
            }
            classify_value(body, tag)
        }
        doc if has_type(&doc, VERIFIABLE_PRESENTATION) => {
            let vp: VerifiablePresentation = serde_json::from_value(doc)
                .map_err(|e| MessageError::UnsupportedPayload(format!("malformed presentation: {e}")))?;
            Ok(Classified {
                tag,
                body: Body::Presentation(Box::new(vp)),
            })
        }
        doc if has_type(&doc, VERIFIABLE_CREDENTIAL) => {
            let vc: VerifiableCredential = serde_json::from_value(doc)
                .map_err(|e| MessageError::UnsupportedPayload(format!("malformed credential: {e}")))?;
            Ok(Classified {
                tag,
                body: Body::Credential(Box::new(vc)),
            })
        }
        _ => Err(MessageError::UnsupportedPayload("unrecognised message shape".into())),
    }
}

fn classify(raw: &str) -> Result<Classified, MessageError> {
    let trimmed = raw.trim();
    if looks_compact(trimmed) {
        return Ok(Classified {
            tag: None,
            body: Body::Token(trimmed.to_string()),
        });
    }
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|_| MessageError::UnsupportedPayload("neither a compact token nor JSON".into()))?;
    classify_value(value, None)
}

/// Classifies raw payloads and checks their proofs.
#[derive(Debug, Clone)]
pub struct MessageValidator {
    issuer: Arc<CredentialIssuer>,
}

impl MessageValidator {
    /// A validator verifying through `issuer`.
    pub fn new(issuer: Arc<CredentialIssuer>) -> Self {
        Self { issuer }
    }

    /// Classify and verify `message`, filling in its type, tag, issuer,
    /// timestamp and data. On error the message is left unclassified.
    pub async fn validate(&self, message: &mut Message) -> Result<(), MessageError> {
        if message.meta().is_empty() {
            return Err(MessageError::MissingProvenance);
        }
        let Classified { tag, body } = classify(&message.raw)?;
        match body {
            Body::Token(token) => {
                let out = self.issuer.verify_signed_token(&token).await;
                if !out.verified {
                    return Err(MessageError::ProofInvalid(out.reason.unwrap_or_default()));
                }
                let claims = out.claims.unwrap_or(Value::Null);
                if claims.get("type").and_then(Value::as_str) != Some(SDR_TYPE) {
                    return Err(MessageError::UnsupportedPayload(
                        "token is not a selective disclosure request".into(),
                    ));
                }
                let sdr = SdrRequest::from_claims(&claims)
                    .map_err(|e| MessageError::UnsupportedPayload(e.to_string()))?;
                message.message_type = Some(MessageType::Sdr);
                message.tag = tag.or(sdr.tag);
                message.issuer = Some(sdr.requester);
                message.timestamp = claims
                    .get("iat")
                    .and_then(Value::as_i64)
                    .and_then(Timestamp::from_unix);
                message.data = Some(claims);
            }
            Body::Credential(vc) => {
                let res = self.issuer.verify_credential(&vc).await;
                if !res.verified {
                    return Err(MessageError::ProofInvalid(res.reason.unwrap_or_default()));
                }
                message.message_type = Some(MessageType::Credential);
                message.tag = tag;
                message.issuer = Some(vc.issuer().clone());
                message.timestamp = Some(vc.credential.issuance_date);
                message.data = Some(serde_json::to_value(&*vc).unwrap_or(Value::Null));
            }
            Body::Presentation(vp) => {
                let res = self.issuer.verify_presentation(&vp, tag.as_deref()).await;
                if !res.verified {
                    return Err(MessageError::ProofInvalid(res.reason.unwrap_or_default()));
                }
                message.message_type = Some(MessageType::Presentation);
                message.tag = tag.or_else(|| vp.proof.challenge().map(str::to_string));
                message.issuer = Some(vp.holder().clone());
                message.timestamp = Some(vp.proof.options.created);
                message.data = Some(serde_json::to_value(&*vp).unwrap_or(Value::Null));
            }
        }
        Ok(())
    }
}
