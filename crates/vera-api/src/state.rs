//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor. It holds the composed agent and the host's own
//! published identity; handlers delegate everything else to the agent.

use std::sync::Arc;

use tokio::sync::OnceCell;
use vera_agent::AgentServices;
use vera_core::VeraError;
use vera_did::web::WEB_PROVIDER;
use vera_did::{CreateIdentifierOptions, Identifier};
use vera_kms::KeyPurpose;

/// Alias of the identifier the host publishes and signs as.
pub const DEFAULT_ALIAS: &str = "default";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The composed agent and its collaborators.
    pub services: AgentServices,
    identity: Arc<OnceCell<Identifier>>,
}

impl AppState {
    /// State over a composed agent. The host identity is created on first use.
    pub fn new(services: AgentServices) -> Self {
        Self {
            services,
            identity: Arc::new(OnceCell::new()),
        }
    }

    /// The host's `did:web` identifier, created on first use together with
    /// the X25519 key it publishes for key agreement.
    pub async fn identity(&self) -> Result<&Identifier, VeraError> {
        self.identity
            .get_or_try_init(|| async {
                let options = CreateIdentifierOptions {
                    alias: Some(DEFAULT_ALIAS.to_string()),
                    path: None,
                };
                let identifiers = &self.services.identifiers;
                let mut identifier = identifiers.get_or_create(WEB_PROVIDER, &options).await?;
                if identifier.encryption_key().is_none() {
                    let key = identifiers
                        .add_key(&identifier.did, KeyPurpose::Encryption)
                        .await?;
                    tracing::info!(
                        did = %identifier.did,
                        key_id = %key.key_id,
                        "host encryption key created"
                    );
                    identifier.keys.push(key);
                }
                Ok::<_, VeraError>(identifier)
            })
            .await
    }

    /// Public `host[:port]` from configuration.
    pub fn hostname(&self) -> &str {
        &self.services.publication.hostname
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("services", &self.services)
            .field("identity", &self.identity.get().map(|i| &i.did))
            .finish()
    }
}
