//! Identifier lifecycle methods.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vera_core::{Did, VeraError};
use vera_did::{CreateIdentifierOptions, Identifier, IdentifierKey, IdentifierManager};
use vera_kms::KeyPurpose;

use super::key_manager::purpose_schema;
use crate::method::{
    decode_args, did_schema, encode_output, object_schema, Method, MethodSpec, NoArgs,
};
use crate::plugin::{undeclared, Plugin};

/// `didManagerGetProviders`: registered provider names.
pub struct DidManagerGetProviders;

impl Method for DidManagerGetProviders {
    const NAME: &'static str = "didManagerGetProviders";
    type Args = NoArgs;
    type Output = Vec<String>;

    fn schema() -> Value {
        object_schema(json!({}), &[])
    }
}

/// `didManagerCreate`: mint an identifier.
pub struct DidManagerCreate;

/// Arguments of [`DidManagerCreate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidManagerCreateArgs {
    /// Provider name, e.g. `did:key`.
    pub provider: String,
    /// Label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Path below the host, for `did:web`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Method for DidManagerCreate {
    const NAME: &'static str = "didManagerCreate";
    type Args = DidManagerCreateArgs;
    type Output = Identifier;

    fn schema() -> Value {
        object_schema(
            json!({
                "provider": {"type": "string", "minLength": 1},
                "alias": {"type": "string"},
                "path": {"type": "string"},
            }),
            &["provider"],
        )
    }
}

/// `didManagerFind`: identifiers by alias and provider.
pub struct DidManagerFind;

/// Arguments of [`DidManagerFind`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidManagerFindArgs {
    /// Label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Provider name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl Method for DidManagerFind {
    const NAME: &'static str = "didManagerFind";
    type Args = DidManagerFindArgs;
    type Output = Vec<Identifier>;

    fn schema() -> Value {
        object_schema(
            json!({"alias": {"type": "string"}, "provider": {"type": "string"}}),
            &[],
        )
    }
}

/// `didManagerGet`: one managed identifier.
pub struct DidManagerGet;

/// Arguments naming one DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidRef {
    /// The DID.
    pub did: Did,
}

impl Method for DidManagerGet {
    const NAME: &'static str = "didManagerGet";
    type Args = DidRef;
    type Output = Identifier;

    fn schema() -> Value {
        object_schema(json!({"did": did_schema()}), &["did"])
    }
}

/// `didManagerAddKey`: attach a fresh key to an identifier.
pub struct DidManagerAddKey;

/// Arguments of [`DidManagerAddKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidManagerAddKeyArgs {
    /// The DID.
    pub did: Did,
    /// What the key is for.
    pub purpose: KeyPurpose,
}

impl Method for DidManagerAddKey {
    const NAME: &'static str = "didManagerAddKey";
    type Args = DidManagerAddKeyArgs;
    type Output = IdentifierKey;

    fn schema() -> Value {
        object_schema(
            json!({"did": did_schema(), "purpose": purpose_schema()}),
            &["did", "purpose"],
        )
    }
}

/// Exposes [`IdentifierManager`].
pub struct DidManagerPlugin {
    identifiers: Arc<IdentifierManager>,
}

impl DidManagerPlugin {
    /// Serve methods from `identifiers`.
    pub fn new(identifiers: Arc<IdentifierManager>) -> Self {
        Self { identifiers }
    }
}

#[async_trait]
impl Plugin for DidManagerPlugin {
    fn name(&self) -> &str {
        "did-manager"
    }

    fn methods(&self) -> Vec<MethodSpec> {
        vec![
            MethodSpec::of::<DidManagerGetProviders>(),
            MethodSpec::of::<DidManagerCreate>(),
            MethodSpec::of::<DidManagerFind>(),
            MethodSpec::of::<DidManagerGet>(),
            MethodSpec::of::<DidManagerAddKey>(),
        ]
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Value, VeraError> {
        match method {
            DidManagerGetProviders::NAME => {
                encode_output::<DidManagerGetProviders>(&self.identifiers.list_types())
            }
            DidManagerCreate::NAME => {
                let args = decode_args::<DidManagerCreate>(args)?;
                let options = CreateIdentifierOptions {
                    alias: args.alias,
                    path: args.path,
                };
                let identifier = self.identifiers.create(&args.provider, &options).await?;
                encode_output::<DidManagerCreate>(&identifier)
            }
            DidManagerFind::NAME => {
                let args = decode_args::<DidManagerFind>(args)?;
                let found = self
                    .identifiers
                    .find(args.alias.as_deref(), args.provider.as_deref())
                    .await?;
                encode_output::<DidManagerFind>(&found)
            }
            DidManagerGet::NAME => {
                let args = decode_args::<DidManagerGet>(args)?;
                let identifier = self.identifiers.get(&args.did).await?;
                encode_output::<DidManagerGet>(&identifier)
            }
            DidManagerAddKey::NAME => {
                let args = decode_args::<DidManagerAddKey>(args)?;
                let key = self.identifiers.add_key(&args.did, args.purpose).await?;
                encode_output::<DidManagerAddKey>(&key)
            }
            other => Err(undeclared(other)),
        }
    }
}
