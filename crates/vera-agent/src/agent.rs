//! # Agent Core
//!
//! One addressable agent over a fixed set of plugins.
//!
//! - [`Agent::execute`] is the dynamic entry point (`name`, JSON arguments).
//! - [`Agent::call`] is the typed one. It serializes `M::Args`, goes through
//!   the same route as `execute`, and decodes `M::Output`.
//! - [`Agent::on`] / [`Agent::emit`] expose the message event bus.
//! - [`Agent::on_raw_message`] and [`Agent::sync_services`] hand inbound
//!   traffic to the message pipeline.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use vera_core::{ConfigurationError, Dispatch, EventBus, EventHandler, VeraError};
use vera_msg::{
    IngestOutcome, MessageEvent, MessageEventKind, MessagePipeline, RawMessage, SourceTimestamp,
    SyncReport, SyncServices,
};
use vera_sdr::ActionSignSdr;

use crate::method::Method;
use crate::plugin::Plugin;
use crate::plugins::CreateSelectiveDisclosureRequest;
use crate::registry::CapabilityRegistry;

/// A typed request for the agent to act on its own behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Sign a selective disclosure request.
    SignSdr(ActionSignSdr),
}

/// The composed agent.
pub struct Agent {
    registry: CapabilityRegistry,
    bus: Arc<EventBus<MessageEvent>>,
    pipeline: Option<Arc<MessagePipeline>>,
    sync: Option<SyncServices>,
}

impl Agent {
    /// Start composing an agent.
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    /// Run `method` with JSON `args`.
    pub async fn execute(&self, method: &str, args: Value) -> Result<Value, VeraError> {
        let plugin = self.registry.route(method, &args)?;
        tracing::debug!(method, plugin = plugin.name(), "agent method invoked");
        plugin.invoke(method, args).await.map_err(|e| {
            tracing::debug!(method, error = %e, "agent method failed");
            e
        })
    }

    /// Run `M` with typed arguments.
    pub async fn call<M: Method>(&self, args: M::Args) -> Result<M::Output, VeraError> {
        let args = serde_json::to_value(args)?;
        let out = self.execute(M::NAME, args).await?;
        Ok(serde_json::from_value(out)?)
    }

    /// Every method the agent answers, sorted.
    pub fn available_methods(&self) -> Vec<&str> {
        self.registry.methods()
    }

    /// The capability registry.
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Subscribe to message events of `kind`.
    pub fn on(&self, kind: MessageEventKind, handler: Arc<dyn EventHandler<MessageEvent>>) {
        self.bus.on(kind, handler);
    }

    /// Publish an event. Returns without waiting for subscribers.
    pub fn emit(&self, event: MessageEvent) -> Dispatch {
        self.bus.emit(event)
    }

    /// The message event bus.
    pub fn bus(&self) -> &Arc<EventBus<MessageEvent>> {
        &self.bus
    }

    /// Carry out `action`. A signed SDR comes back as a compact token.
    pub async fn handle_action(&self, action: Action) -> Result<String, VeraError> {
        match action {
            Action::SignSdr(sign) => self.call::<CreateSelectiveDisclosureRequest>(sign).await,
        }
    }

    /// Hand an inbound message to the pipeline. Processing continues in the
    /// background; the handle may be dropped.
    pub fn on_raw_message(&self, raw: RawMessage) -> Result<JoinHandle<IngestOutcome>, VeraError> {
        Ok(self.pipeline()?.ingest(raw))
    }

    /// The message pipeline.
    pub fn pipeline(&self) -> Result<&Arc<MessagePipeline>, VeraError> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| ConfigurationError::MissingPlugin("message pipeline".into()).into())
    }

    /// Start every message source.
    pub async fn start_sync(&self) -> Result<(), VeraError> {
        Ok(self.sync()?.start().await?)
    }

    /// One sync pass, resuming from `latest`.
    pub async fn sync_services(&self, latest: &[SourceTimestamp]) -> Result<SyncReport, VeraError> {
        Ok(self.sync()?.sync(latest).await)
    }

    fn sync(&self) -> Result<&SyncServices, VeraError> {
        self.sync
            .as_ref()
            .ok_or_else(|| ConfigurationError::MissingPlugin("sync services".into()).into())
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("registry", &self.registry)
            .field("pipeline", &self.pipeline.is_some())
            .field("sync", &self.sync)
            .finish()
    }
}

/// Collects plugins and pipeline parts for an [`Agent`].
#[derive(Default)]
pub struct AgentBuilder {
    plugins: Vec<Arc<dyn Plugin>>,
    pipeline: Option<Arc<MessagePipeline>>,
    sync: Option<SyncServices>,
}

impl AgentBuilder {
    /// Add a plugin.
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Attach the message pipeline. Its bus becomes the agent's bus.
    pub fn pipeline(mut self, pipeline: Arc<MessagePipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Attach sync services.
    pub fn sync_services(mut self, sync: SyncServices) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Build the capability registry and the agent.
    pub fn build(self) -> Result<Agent, VeraError> {
        let registry = CapabilityRegistry::build(self.plugins)?;
        let bus = self
            .pipeline
            .as_ref()
            .map(|p| Arc::clone(p.bus()))
            .unwrap_or_default();
        Ok(Agent {
            registry,
            bus,
            pipeline: self.pipeline,
            sync: self.sync,
        })
    }
}
