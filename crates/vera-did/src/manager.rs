//! # Identifier Manager
//!
//! Creates identifiers through named [`DidProvider`]s and keeps them in a
//! [`DidStore`]. A provider must implement `create`; key updates and
//! deactivation are optional and report [`DidError::Unsupported`] by default.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use vera_core::Did;
use vera_kms::KeyPurpose;

use crate::error::DidError;
use crate::identifier::{CreateIdentifierOptions, Identifier, IdentifierKey};
use crate::store::DidStore;

/// Creates and maintains identifiers of one DID method.
#[async_trait]
pub trait DidProvider: Send + Sync {
    /// Provider name, e.g. `did:key`.
    fn name(&self) -> &str;

    /// Mint keys and create a new identifier.
    async fn create(&self, options: &CreateIdentifierOptions) -> Result<Identifier, DidError>;

    /// Add a key for `purpose` to an existing identifier.
    async fn update_keys(
        &self,
        _identifier: &Identifier,
        _purpose: KeyPurpose,
    ) -> Result<IdentifierKey, DidError> {
        Err(DidError::Unsupported {
            provider: self.name().to_string(),
            operation: "update_keys",
        })
    }

    /// Retire an identifier.
    async fn deactivate(&self, _identifier: &Identifier) -> Result<(), DidError> {
        Err(DidError::Unsupported {
            provider: self.name().to_string(),
            operation: "deactivate",
        })
    }
}

/// Front door for identifier lifecycle.
pub struct IdentifierManager {
    providers: BTreeMap<String, Arc<dyn DidProvider>>,
    store: Arc<dyn DidStore>,
}

impl IdentifierManager {
    /// A manager with no providers.
    pub fn new(store: Arc<dyn DidStore>) -> Self {
        Self {
            providers: BTreeMap::new(),
            store,
        }
    }

    /// Register a provider under its name.
    pub fn register_provider(&mut self, provider: Arc<dyn DidProvider>) -> Result<(), DidError> {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            return Err(DidError::DuplicateProvider(name));
        }
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Builder form of [`register_provider`](Self::register_provider).
    pub fn with_provider(mut self, provider: Arc<dyn DidProvider>) -> Result<Self, DidError> {
        self.register_provider(provider)?;
        Ok(self)
    }

    /// Names of the registered providers, sorted.
    pub fn list_types(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    fn provider(&self, name: &str) -> Result<&Arc<dyn DidProvider>, DidError> {
        self.providers
            .get(name)
            .ok_or_else(|| DidError::UnknownProvider(name.to_string()))
    }

    /// Create an identifier with the named provider.
    pub async fn create(
        &self,
        provider: &str,
        options: &CreateIdentifierOptions,
    ) -> Result<Identifier, DidError> {
        let identifier = self.provider(provider)?.create(options).await?;
        self.store.save(&identifier).await?;
        tracing::info!(did = %identifier.did, provider, "identifier created");
        Ok(identifier)
    }

    /// Return the identifier with `alias` from `provider`, creating it if absent.
    pub async fn get_or_create(
        &self,
        provider: &str,
        options: &CreateIdentifierOptions,
    ) -> Result<Identifier, DidError> {
        let existing = self
            .find(options.alias.as_deref(), Some(provider))
            .await?
            .into_iter()
            .next();
        match existing {
            Some(identifier) => Ok(identifier),
            None => self.create(provider, options).await,
        }
    }

    /// Identifiers able to sign, oldest first.
    pub async fn list_issuers(&self) -> Result<Vec<Identifier>, DidError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|i| i.signing_key().is_some())
            .collect())
    }

    /// A managed identifier.
    pub async fn get(&self, did: &Did) -> Result<Identifier, DidError> {
        self.store
            .get(did)
            .await?
            .ok_or_else(|| DidError::UnknownIdentifier(did.to_string()))
    }

    /// A managed identifier, as an issuing identity.
    pub async fn issuer(&self, did: &Did) -> Result<Identifier, DidError> {
        self.get(did).await
    }

    /// Identifiers matching an optional alias and provider.
    pub async fn find(
        &self,
        alias: Option<&str>,
        provider: Option<&str>,
    ) -> Result<Vec<Identifier>, DidError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|i| alias.map_or(true, |a| i.alias.as_deref() == Some(a)))
            .filter(|i| provider.map_or(true, |p| i.provider == p))
            .collect())
    }

    /// Add a key for `purpose` to a managed identifier.
    pub async fn add_key(&self, did: &Did, purpose: KeyPurpose) -> Result<IdentifierKey, DidError> {
        let mut identifier = self.get(did).await?;
        let key = self
            .provider(&identifier.provider)?
            .update_keys(&identifier, purpose)
            .await?;
        identifier.keys.push(key.clone());
        self.store.save(&identifier).await?;
        tracing::info!(%did, %purpose, key_id = %key.key_id, "key added to identifier");
        Ok(key)
    }

    /// Deactivate and forget a managed identifier.
    pub async fn remove(&self, did: &Did) -> Result<bool, DidError> {
        let identifier = self.get(did).await?;
        self.provider(&identifier.provider)?
            .deactivate(&identifier)
            .await?;
        self.store.delete(did).await
    }
}

impl std::fmt::Debug for IdentifierManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierManager")
            .field("providers", &self.list_types())
            .finish_non_exhaustive()
    }
}
