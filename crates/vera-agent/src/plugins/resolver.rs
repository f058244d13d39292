//! DID resolution.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vera_core::{split_did_url, VeraError};
use vera_did::{DidDocument, ResolverRegistry};

use crate::method::{decode_args, encode_output, object_schema, Method, MethodSpec};
use crate::plugin::{undeclared, Plugin};

/// `resolveDid`: fetch the document for a DID or DID URL.
pub struct ResolveDid;

/// Arguments of [`ResolveDid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDidArgs {
    /// A DID, optionally with a fragment.
    pub did_url: String,
}

impl Method for ResolveDid {
    const NAME: &'static str = "resolveDid";
    type Args = ResolveDidArgs;
    type Output = DidDocument;

    fn schema() -> Value {
        object_schema(
            json!({"didUrl": {"type": "string", "pattern": "^did:[a-z0-9]+:.+"}}),
            &["didUrl"],
        )
    }
}

/// Exposes [`ResolverRegistry`].
pub struct ResolverPlugin {
    resolver: Arc<ResolverRegistry>,
}

impl ResolverPlugin {
    /// Resolve through `resolver`.
    pub fn new(resolver: Arc<ResolverRegistry>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Plugin for ResolverPlugin {
    fn name(&self) -> &str {
        "resolver"
    }

    fn methods(&self) -> Vec<MethodSpec> {
        vec![MethodSpec::of::<ResolveDid>()]
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Value, VeraError> {
        match method {
            ResolveDid::NAME => {
                let args = decode_args::<ResolveDid>(args)?;
                let (did, _) = split_did_url(&args.did_url)?;
                let doc = self.resolver.resolve(&did).await?;
                encode_output::<ResolveDid>(&doc)
            }
            other => Err(undeclared(other)),
        }
    }
}
