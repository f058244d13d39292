//! Key custody methods.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vera_core::{Did, ValidationError, VeraError};
use vera_kms::{KeyId, KeyKind, KeyManager, KeyPair, KeyPurpose};

use crate::method::{decode_args, did_schema, encode_output, object_schema, Method, MethodSpec};
use crate::plugin::{undeclared, Plugin};

fn kind_schema() -> Value {
    json!({"enum": ["Ed25519", "X25519"]})
}

pub(crate) fn purpose_schema() -> Value {
    json!({"enum": ["signing", "encryption"]})
}

/// `keyManagerCreate`: generate a key.
pub struct KeyManagerCreate;

/// Arguments of [`KeyManagerCreate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyManagerCreateArgs {
    /// Algorithm.
    pub kind: KeyKind,
}

impl Method for KeyManagerCreate {
    const NAME: &'static str = "keyManagerCreate";
    type Args = KeyManagerCreateArgs;
    type Output = KeyPair;

    fn schema() -> Value {
        object_schema(json!({"kind": kind_schema()}), &["kind"])
    }
}

/// `keyManagerGet`: look a key up by id.
pub struct KeyManagerGet;

/// Arguments naming one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRef {
    /// Key id.
    pub key_id: KeyId,
}

impl Method for KeyManagerGet {
    const NAME: &'static str = "keyManagerGet";
    type Args = KeyRef;
    type Output = KeyPair;

    fn schema() -> Value {
        object_schema(json!({"keyId": {"type": "string", "minLength": 1}}), &["keyId"])
    }
}

/// How `keyManagerSign` should read `data`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataEncoding {
    /// The UTF-8 bytes of the string.
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    /// Standard base64.
    #[serde(rename = "base64")]
    Base64,
}

/// `keyManagerSign`: sign bytes with a managed key.
pub struct KeyManagerSign;

/// Arguments of [`KeyManagerSign`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyManagerSignArgs {
    /// Signing key.
    pub key_id: KeyId,
    /// Payload.
    pub data: String,
    /// How `data` is encoded.
    #[serde(default)]
    pub encoding: DataEncoding,
}

/// A detached signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    /// Standard base64 of the signature bytes.
    pub signature: String,
}

impl Method for KeyManagerSign {
    const NAME: &'static str = "keyManagerSign";
    type Args = KeyManagerSignArgs;
    type Output = KeySignature;

    fn schema() -> Value {
        object_schema(
            json!({
                "keyId": {"type": "string", "minLength": 1},
                "data": {"type": "string"},
                "encoding": {"enum": ["utf-8", "base64"]},
            }),
            &["keyId", "data"],
        )
    }
}

/// `keyManagerGetForIdentifier`: the key bound to a DID for a purpose.
pub struct KeyManagerGetForIdentifier;

/// Arguments of [`KeyManagerGetForIdentifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierKeyRef {
    /// Owning DID.
    pub did: Did,
    /// Purpose of the binding.
    pub purpose: KeyPurpose,
}

impl Method for KeyManagerGetForIdentifier {
    const NAME: &'static str = "keyManagerGetForIdentifier";
    type Args = IdentifierKeyRef;
    type Output = Option<KeyPair>;

    fn schema() -> Value {
        object_schema(
            json!({"did": did_schema(), "purpose": purpose_schema()}),
            &["did", "purpose"],
        )
    }
}

/// Exposes [`KeyManager`].
pub struct KeyManagerPlugin {
    kms: Arc<KeyManager>,
}

impl KeyManagerPlugin {
    /// Serve methods from `kms`.
    pub fn new(kms: Arc<KeyManager>) -> Self {
        Self { kms }
    }

    async fn sign(&self, args: KeyManagerSignArgs) -> Result<KeySignature, VeraError> {
        let payload = match args.encoding {
            DataEncoding::Utf8 => args.data.into_bytes(),
            DataEncoding::Base64 => BASE64.decode(args.data.as_bytes()).map_err(|e| {
                ValidationError::InvalidArguments {
                    method: KeyManagerSign::NAME.to_string(),
                    reason: format!("data is not base64: {e}"),
                }
            })?,
        };
        let signature = self.kms.sign(&args.key_id, &payload).await?;
        Ok(KeySignature {
            signature: BASE64.encode(signature),
        })
    }
}

#[async_trait]
impl Plugin for KeyManagerPlugin {
    fn name(&self) -> &str {
        "key-manager"
    }

    fn methods(&self) -> Vec<MethodSpec> {
        vec![
            MethodSpec::of::<KeyManagerCreate>(),
            MethodSpec::of::<KeyManagerGet>(),
            MethodSpec::of::<KeyManagerSign>(),
            MethodSpec::of::<KeyManagerGetForIdentifier>(),
        ]
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Value, VeraError> {
        match method {
            KeyManagerCreate::NAME => {
                let args = decode_args::<KeyManagerCreate>(args)?;
                let kp = self.kms.create_key_pair(args.kind).await?;
                encode_output::<KeyManagerCreate>(&kp)
            }
            KeyManagerGet::NAME => {
                let args = decode_args::<KeyManagerGet>(args)?;
                let kp = self.kms.get(&args.key_id).await?;
                encode_output::<KeyManagerGet>(&kp)
            }
            KeyManagerSign::NAME => {
                let args = decode_args::<KeyManagerSign>(args)?;
                let sig = self.sign(args).await?;
                encode_output::<KeyManagerSign>(&sig)
            }
            KeyManagerGetForIdentifier::NAME => {
                let args = decode_args::<KeyManagerGetForIdentifier>(args)?;
                let kp = self
                    .kms
                    .get_key_pair_for_identifier(&args.did, args.purpose)
                    .await?;
                encode_output::<KeyManagerGetForIdentifier>(&kp)
            }
            other => Err(undeclared(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vera_core::ErrorClass;
    use vera_crypto::{verify_with_public_key, Ed25519PublicKey, Ed25519Signature};
    use vera_kms::MemoryKeyStore;

    fn plugin() -> KeyManagerPlugin {
        KeyManagerPlugin::new(Arc::new(KeyManager::new(Arc::new(MemoryKeyStore::new()))))
    }

    async fn create(plugin: &KeyManagerPlugin, kind: &str) -> KeyPair {
        let out = plugin
            .invoke(KeyManagerCreate::NAME, json!({"kind": kind}))
            .await
            .unwrap();
        serde_json::from_value(out).unwrap()
    }

    fn check(kp: &KeyPair, message: &[u8], sig: &KeySignature) {
        let bytes: [u8; 64] = BASE64.decode(&sig.signature).unwrap().try_into().unwrap();
        let pk = Ed25519PublicKey::from_hex(&kp.public_key.public_key_hex).unwrap();
        verify_with_public_key(message, &Ed25519Signature::from_bytes(bytes), &pk).unwrap();
    }

    #[tokio::test]
    async fn signs_utf8_and_base64_payloads() {
        let plugin = plugin();
        let kp = create(&plugin, "Ed25519").await;

        let out = plugin
            .invoke(
                KeyManagerSign::NAME,
                json!({"keyId": kp.key_id, "data": "hello"}),
            )
            .await
            .unwrap();
        check(&kp, b"hello", &serde_json::from_value(out).unwrap());

        let out = plugin
            .invoke(
                KeyManagerSign::NAME,
                json!({"keyId": kp.key_id, "data": BASE64.encode([0u8, 159, 255]), "encoding": "base64"}),
            )
            .await
            .unwrap();
        check(&kp, &[0u8, 159, 255], &serde_json::from_value(out).unwrap());
    }

    #[tokio::test]
    async fn bad_base64_is_invalid_arguments() {
        let plugin = plugin();
        let kp = create(&plugin, "Ed25519").await;
        let err = plugin
            .invoke(
                KeyManagerSign::NAME,
                json!({"keyId": kp.key_id, "data": "not base64!", "encoding": "base64"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VeraError::Validation(ValidationError::InvalidArguments { .. })
        ));
    }

    #[tokio::test]
    async fn agreement_keys_cannot_sign() {
        let plugin = plugin();
        let kp = create(&plugin, "X25519").await;
        let err = plugin
            .invoke(KeyManagerSign::NAME, json!({"keyId": kp.key_id, "data": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[tokio::test]
    async fn unbound_identifier_has_no_key() {
        let out = plugin()
            .invoke(
                KeyManagerGetForIdentifier::NAME,
                json!({"did": "did:key:z6MkNobody", "purpose": "signing"}),
            )
            .await
            .unwrap();
        assert_eq!(out, Value::Null);
    }
}
