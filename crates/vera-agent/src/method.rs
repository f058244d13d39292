//! # Typed Methods
//!
//! Every agent method is a zero-sized type implementing [`Method`]. The type
//! fixes the wire name, the argument and output shapes, and the JSON Schema
//! that arguments are checked against before any plugin sees them.
//!
//! Plugins advertise methods with [`MethodSpec::of`], decode arguments with
//! [`decode_args`] and encode results with [`encode_output`], so the name and
//! the shapes cannot drift apart.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vera_core::{ValidationError, VeraError};

/// A named agent method with typed arguments and output.
pub trait Method: Send + Sync + 'static {
    /// Wire name, e.g. `didManagerCreate`.
    const NAME: &'static str;

    /// Arguments.
    type Args: Serialize + DeserializeOwned + Send;

    /// Result.
    type Output: Serialize + DeserializeOwned + Send;

    /// JSON Schema for `Args`.
    fn schema() -> Value;
}

/// Registry entry for one method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSpec {
    /// Wire name.
    pub name: &'static str,
    /// Argument schema.
    pub schema: Value,
}

impl MethodSpec {
    /// The entry for `M`.
    pub fn of<M: Method>() -> Self {
        Self {
            name: M::NAME,
            schema: M::schema(),
        }
    }
}

/// Decode already schema-checked arguments for `M`.
pub fn decode_args<M: Method>(args: Value) -> Result<M::Args, VeraError> {
    serde_json::from_value(args).map_err(|e| {
        ValidationError::InvalidArguments {
            method: M::NAME.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Encode a result of `M`.
pub fn encode_output<M: Method>(output: &M::Output) -> Result<Value, VeraError> {
    Ok(serde_json::to_value(output)?)
}

/// Arguments of a method that takes none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoArgs {}

/// Schema of an object with the given properties, of which `required` must
/// be present, and nothing else.
pub(crate) fn object_schema(properties: Value, required: &[&str]) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// Schema of a DID string.
pub(crate) fn did_schema() -> Value {
    serde_json::json!({"type": "string", "pattern": "^did:[a-z0-9]+:.+"})
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct EchoArgs {
        text: String,
    }

    struct Echo;

    impl Method for Echo {
        const NAME: &'static str = "echo";
        type Args = EchoArgs;
        type Output = String;

        fn schema() -> Value {
            object_schema(json!({"text": {"type": "string"}}), &["text"])
        }
    }

    #[test]
    fn spec_is_derived_from_the_type() {
        let spec = MethodSpec::of::<Echo>();
        assert_eq!(spec.name, "echo");
        assert_eq!(spec.schema["required"], json!(["text"]));
        assert_eq!(spec.schema["additionalProperties"], json!(false));
    }

    #[test]
    fn decode_failures_name_the_method() {
        let err = decode_args::<Echo>(json!({"text": 5})).unwrap_err();
        match err {
            VeraError::Validation(ValidationError::InvalidArguments { method, .. }) => {
                assert_eq!(method, "echo")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            decode_args::<Echo>(json!({"text": "hi"})).unwrap(),
            EchoArgs { text: "hi".into() }
        );
    }
}
