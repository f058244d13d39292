//! # Capability Registry
//!
//! Built once from the plugin list at composition time. Each declared method
//! name maps to exactly one plugin and to its compiled argument schema.
//!
//! ## Routing
//!
//! 1. Unknown name: [`NotFoundError::MethodNotFound`]. No plugin runs.
//! 2. Arguments failing the schema: [`ValidationError::InvalidArguments`]
//!    with every schema violation listed. No plugin runs.
//! 3. Otherwise the owning plugin is returned.
//!
//! Routing depends only on the method name and on the registry's contents,
//! which never change after [`CapabilityRegistry::build`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use vera_core::{ConfigurationError, NotFoundError, ValidationError, VeraError};

use crate::plugin::Plugin;

struct Route {
    plugin: Arc<dyn Plugin>,
    validator: jsonschema::Validator,
}

/// Method name to (plugin, argument validator).
pub struct CapabilityRegistry {
    routes: BTreeMap<String, Route>,
}

impl CapabilityRegistry {
    /// Compile every plugin's method table.
    ///
    /// Fails with [`ConfigurationError::CapabilityConflict`] when two plugins
    /// declare the same name and [`ConfigurationError::InvalidSchema`] when a
    /// schema does not compile.
    pub fn build(plugins: Vec<Arc<dyn Plugin>>) -> Result<Self, VeraError> {
        let mut routes: BTreeMap<String, Route> = BTreeMap::new();
        for plugin in plugins {
            for spec in plugin.methods() {
                if let Some(existing) = routes.get(spec.name) {
                    return Err(ConfigurationError::CapabilityConflict {
                        method: spec.name.to_string(),
                        first: existing.plugin.name().to_string(),
                        second: plugin.name().to_string(),
                    }
                    .into());
                }
                let validator = jsonschema::options()
                    .with_draft(jsonschema::Draft::Draft202012)
                    .build(&spec.schema)
                    .map_err(|e| ConfigurationError::InvalidSchema {
                        method: spec.name.to_string(),
                        reason: e.to_string(),
                    })?;
                routes.insert(
                    spec.name.to_string(),
                    Route {
                        plugin: Arc::clone(&plugin),
                        validator,
                    },
                );
            }
            tracing::debug!(plugin = plugin.name(), "plugin registered");
        }
        tracing::info!(methods = routes.len(), "capability registry built");
        Ok(Self { routes })
    }

    /// The plugin that should run `method` with `args`.
    pub fn route(&self, method: &str, args: &Value) -> Result<Arc<dyn Plugin>, VeraError> {
        let route = self
            .routes
            .get(method)
            .ok_or_else(|| NotFoundError::MethodNotFound(method.to_string()))?;

        let violations: Vec<String> = route
            .validator
            .iter_errors(args)
            .map(|e| {
                let at = e.instance_path.to_string();
                if at.is_empty() {
                    e.to_string()
                } else {
                    format!("{at}: {e}")
                }
            })
            .collect();
        if !violations.is_empty() {
            return Err(ValidationError::InvalidArguments {
                method: method.to_string(),
                reason: violations.join("; "),
            }
            .into());
        }
        Ok(Arc::clone(&route.plugin))
    }

    /// Whether some plugin declares `method`.
    pub fn contains(&self, method: &str) -> bool {
        self.routes.contains_key(method)
    }

    /// Name of the plugin owning `method`.
    pub fn owner(&self, method: &str) -> Option<&str> {
        self.routes.get(method).map(|r| r.plugin.name())
    }

    /// Every declared method name, sorted.
    pub fn methods(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.routes.iter().map(|(m, r)| (m, r.plugin.name())))
            .finish()
    }
}
