//! Stored message queries.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use vera_core::VeraError;
use vera_msg::{DataStore, Message, MessageFilter};

use crate::method::{decode_args, encode_output, object_schema, Method, MethodSpec};
use crate::plugin::{undeclared, Plugin};

/// `dataStoreGetMessages`: validated messages matching a filter, oldest first.
pub struct DataStoreGetMessages;

impl Method for DataStoreGetMessages {
    const NAME: &'static str = "dataStoreGetMessages";
    type Args = MessageFilter;
    type Output = Vec<Message>;

    fn schema() -> Value {
        let nullable = |t: &str| json!({"type": [t, "null"]});
        object_schema(
            json!({
                "hash": {"type": ["string", "null"], "pattern": "^[0-9a-f]{64}$"},
                "type": {"enum": ["sdr", "w3c.vc", "w3c.vp", null]},
                "tag": nullable("string"),
                "issuer": nullable("string"),
            }),
            &[],
        )
    }
}

/// Exposes a [`DataStore`].
pub struct MessagePlugin {
    store: Arc<dyn DataStore>,
}

impl MessagePlugin {
    /// Query `store`.
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Plugin for MessagePlugin {
    fn name(&self) -> &str {
        "data-store"
    }

    fn methods(&self) -> Vec<MethodSpec> {
        vec![MethodSpec::of::<DataStoreGetMessages>()]
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Value, VeraError> {
        match method {
            DataStoreGetMessages::NAME => {
                let filter = decode_args::<DataStoreGetMessages>(args)?;
                let messages = self.store.find_messages(&filter).await?;
                encode_output::<DataStoreGetMessages>(&messages)
            }
            other => Err(undeclared(other)),
        }
    }
}
