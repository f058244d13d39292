#![warn(missing_docs)]
//! # vera-agent
//!
//! The addressable agent: a fixed set of [`Plugin`]s behind one
//! [`CapabilityRegistry`], reached either dynamically through
//! [`Agent::execute`] or with compile-time types through [`Agent::call`].
//!
//! ## Routing
//!
//! Every method name belongs to exactly one plugin. Arguments are checked
//! against the method's JSON Schema before the plugin sees them, so a
//! plugin only ever decodes arguments that already passed validation.
//!
//! ## Composition
//!
//! [`compose`] builds the standard agent from an [`AgentConfig`] (usually
//! [`AgentConfig::from_env`]): `did:key` and `did:web` providers, both
//! built-in proof suites, an in-memory message store, and the six built-in
//! plugins listed in [`plugins`].

pub mod agent;
pub mod compose;
pub mod config;
pub mod method;
pub mod plugin;
pub mod plugins;
pub mod registry;

pub use agent::{Action, Agent, AgentBuilder};
pub use compose::{compose, AgentServices};
pub use config::{AgentConfig, KeyStoreConfig};
pub use method::{decode_args, encode_output, Method, MethodSpec, NoArgs};
pub use plugin::Plugin;
pub use registry::CapabilityRegistry;
