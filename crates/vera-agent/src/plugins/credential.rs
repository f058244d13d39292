//! Credential and presentation methods.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vera_core::VeraError;
use vera_vc::{
    CredentialIssuer, CredentialPayload, PresentationPayload, VerifiableCredential,
    VerifiablePresentation, VerificationResult,
};

use crate::method::{decode_args, encode_output, object_schema, Method, MethodSpec};
use crate::plugin::{undeclared, Plugin};

fn credential_schema(signed: bool) -> Value {
    let mut required = vec!["@context", "type", "issuer", "issuanceDate", "credentialSubject"];
    if signed {
        required.push("proof");
    }
    json!({"type": "object", "required": required})
}

fn presentation_schema(signed: bool) -> Value {
    let mut required = vec!["@context", "type", "holder"];
    if signed {
        required.push("proof");
    }
    json!({
        "type": "object",
        "required": required,
        "properties": {
            "verifiableCredential": {"type": "array", "items": credential_schema(true)},
        },
    })
}

fn suite_schema() -> Value {
    json!({"type": "string", "minLength": 1})
}

/// `createVerifiableCredential`: sign a credential as its issuer.
pub struct CreateVerifiableCredential;

/// Arguments of [`CreateVerifiableCredential`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCredentialArgs {
    /// The unsigned credential.
    pub credential: CredentialPayload,
    /// Proof suite id, e.g. `Ed25519Signature2020`.
    pub proof_format: String,
}

impl Method for CreateVerifiableCredential {
    const NAME: &'static str = "createVerifiableCredential";
    type Args = CreateCredentialArgs;
    type Output = VerifiableCredential;

    fn schema() -> Value {
        object_schema(
            json!({"credential": credential_schema(false), "proofFormat": suite_schema()}),
            &["credential", "proofFormat"],
        )
    }
}

/// `createVerifiablePresentation`: sign a presentation as its holder.
pub struct CreateVerifiablePresentation;

/// Arguments of [`CreateVerifiablePresentation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePresentationArgs {
    /// The unsigned presentation.
    pub presentation: PresentationPayload,
    /// Verifier-chosen nonce bound into the proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    /// Proof suite id.
    pub proof_format: String,
}

impl Method for CreateVerifiablePresentation {
    const NAME: &'static str = "createVerifiablePresentation";
    type Args = CreatePresentationArgs;
    type Output = VerifiablePresentation;

    fn schema() -> Value {
        object_schema(
            json!({
                "presentation": presentation_schema(false),
                "challenge": {"type": "string"},
                "proofFormat": suite_schema(),
            }),
            &["presentation", "proofFormat"],
        )
    }
}

/// `verifyCredential`: check a credential's proof and expiry.
pub struct VerifyCredential;

/// Arguments of [`VerifyCredential`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyCredentialArgs {
    /// The credential.
    pub credential: VerifiableCredential,
}

impl Method for VerifyCredential {
    const NAME: &'static str = "verifyCredential";
    type Args = VerifyCredentialArgs;
    type Output = VerificationResult;

    fn schema() -> Value {
        object_schema(json!({"credential": credential_schema(true)}), &["credential"])
    }
}

/// `verifyPresentation`: check a presentation and everything it carries.
pub struct VerifyPresentation;

/// Arguments of [`VerifyPresentation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyPresentationArgs {
    /// The presentation.
    pub presentation: VerifiablePresentation,
    /// Expected challenge. Unchecked when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}

impl Method for VerifyPresentation {
    const NAME: &'static str = "verifyPresentation";
    type Args = VerifyPresentationArgs;
    type Output = VerificationResult;

    fn schema() -> Value {
        object_schema(
            json!({"presentation": presentation_schema(true), "challenge": {"type": "string"}}),
            &["presentation"],
        )
    }
}

/// Exposes [`CredentialIssuer`].
pub struct CredentialPlugin {
    issuer: Arc<CredentialIssuer>,
}

impl CredentialPlugin {
    /// Serve methods from `issuer`.
    pub fn new(issuer: Arc<CredentialIssuer>) -> Self {
        Self { issuer }
    }
}

#[async_trait]
impl Plugin for CredentialPlugin {
    fn name(&self) -> &str {
        "credential"
    }

    fn methods(&self) -> Vec<MethodSpec> {
        vec![
            MethodSpec::of::<CreateVerifiableCredential>(),
            MethodSpec::of::<CreateVerifiablePresentation>(),
            MethodSpec::of::<VerifyCredential>(),
            MethodSpec::of::<VerifyPresentation>(),
        ]
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Value, VeraError> {
        match method {
            CreateVerifiableCredential::NAME => {
                let args = decode_args::<CreateVerifiableCredential>(args)?;
                let vc = self
                    .issuer
                    .create_verifiable_credential(args.credential, &args.proof_format)
                    .await?;
                encode_output::<CreateVerifiableCredential>(&vc)
            }
            CreateVerifiablePresentation::NAME => {
                let args = decode_args::<CreateVerifiablePresentation>(args)?;
                let vp = self
                    .issuer
                    .create_verifiable_presentation(
                        args.presentation,
                        args.challenge.as_deref(),
                        &args.proof_format,
                    )
                    .await?;
                encode_output::<CreateVerifiablePresentation>(&vp)
            }
            VerifyCredential::NAME => {
                let args = decode_args::<VerifyCredential>(args)?;
                let result = self.issuer.verify_credential(&args.credential).await;
                encode_output::<VerifyCredential>(&result)
            }
            VerifyPresentation::NAME => {
                let args = decode_args::<VerifyPresentation>(args)?;
                let result = self
                    .issuer
                    .verify_presentation(&args.presentation, args.challenge.as_deref())
                    .await;
                encode_output::<VerifyPresentation>(&result)
            }
            other => Err(undeclared(other)),
        }
    }
}
