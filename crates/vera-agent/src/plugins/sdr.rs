//! Selective disclosure requests.

use async_trait::async_trait;
use serde_json::{json, Value};
use vera_core::VeraError;
use vera_sdr::{ActionSignSdr, SdrActionHandler};

use crate::method::{decode_args, did_schema, encode_output, object_schema, Method, MethodSpec};
use crate::plugin::{undeclared, Plugin};

/// `createSelectiveDisclosureRequest`: sign an SDR as a compact token.
pub struct CreateSelectiveDisclosureRequest;

impl Method for CreateSelectiveDisclosureRequest {
    const NAME: &'static str = "createSelectiveDisclosureRequest";
    type Args = ActionSignSdr;
    type Output = String;

    fn schema() -> Value {
        let claim = object_schema(
            json!({
                "reason": {"type": "string"},
                "essential": {"type": "boolean"},
                "claimType": {"type": "string", "minLength": 1},
                "issuers": {"type": "array", "items": did_schema()},
            }),
            &["claimType"],
        );
        object_schema(
            json!({
                "did": did_schema(),
                "data": object_schema(
                    json!({
                        "tag": {"type": "string", "minLength": 1},
                        "claims": {"type": "array", "items": claim},
                    }),
                    &["tag", "claims"],
                ),
            }),
            &["did", "data"],
        )
    }
}

/// Exposes [`SdrActionHandler`].
pub struct SdrPlugin {
    handler: SdrActionHandler,
}

impl SdrPlugin {
    /// Sign through `handler`.
    pub fn new(handler: SdrActionHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Plugin for SdrPlugin {
    fn name(&self) -> &str {
        "selective-disclosure"
    }

    fn methods(&self) -> Vec<MethodSpec> {
        vec![MethodSpec::of::<CreateSelectiveDisclosureRequest>()]
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Value, VeraError> {
        match method {
            CreateSelectiveDisclosureRequest::NAME => {
                let action = decode_args::<CreateSelectiveDisclosureRequest>(args)?;
                let token = self.handler.handle(action).await?;
                encode_output::<CreateSelectiveDisclosureRequest>(&token)
            }
            other => Err(undeclared(other)),
        }
    }
}
