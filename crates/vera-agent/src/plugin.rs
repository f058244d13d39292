//! The plugin contract.

use async_trait::async_trait;
use serde_json::Value;
use vera_core::VeraError;

use crate::method::MethodSpec;

/// A capability module contributing methods to the agent.
///
/// The registry only calls [`invoke`](Plugin::invoke) with a method name the
/// plugin declared in [`methods`](Plugin::methods) and with arguments that
/// already satisfy that method's schema.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in conflict reports and logs.
    fn name(&self) -> &str;

    /// Methods this plugin implements.
    fn methods(&self) -> Vec<MethodSpec>;

    /// Run `method`.
    async fn invoke(&self, method: &str, args: Value) -> Result<Value, VeraError>;
}

/// Error for a method name a plugin was asked to run but does not declare.
pub(crate) fn undeclared(method: &str) -> VeraError {
    vera_core::NotFoundError::MethodNotFound(method.to_string()).into()
}
