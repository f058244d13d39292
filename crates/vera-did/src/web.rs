//! # `did:web`
//!
//! `did:web:example.com` resolves to `https://example.com/.well-known/did.json`;
//! `did:web:example.com:users:alice` to `https://example.com/users/alice/did.json`.
//! A port is percent-encoded in the host segment (`localhost%3A8080`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use vera_core::{Did, Timestamp};
use vera_kms::{KeyManager, KeyPurpose};

use crate::document::DidDocument;
use crate::error::DidError;
use crate::identifier::{CreateIdentifierOptions, Identifier, IdentifierKey};
use crate::manager::DidProvider;
use crate::resolver::DidResolver;

/// Provider name for `did:web`.
pub const WEB_PROVIDER: &str = "did:web";

/// Encode a hostname (optionally with port) as a `did:web` host segment.
pub fn encode_host(hostname: &str) -> String {
    hostname.replace(':', "%3A")
}

/// The `did:web` DID for a hostname and optional path.
pub fn web_did(hostname: &str, path: Option<&str>) -> Result<Did, DidError> {
    let mut did = format!("did:web:{}", encode_host(hostname));
    if let Some(path) = path {
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            did.push(':');
            did.push_str(segment);
        }
    }
    Ok(Did::new(did)?)
}

/// Fetches `did:web` documents over HTTP(S).
#[derive(Debug, Clone)]
pub struct WebDidResolver {
    client: reqwest::Client,
    scheme: &'static str,
}

impl WebDidResolver {
    /// A resolver using HTTPS with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, DidError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DidError::Storage(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            scheme: "https",
        })
    }

    /// Fetch over plain HTTP. For local development and tests only.
    pub fn insecure_http(mut self) -> Self {
        self.scheme = "http";
        self
    }

    /// The URL the document for `did` is fetched from.
    pub fn document_url(&self, did: &Did) -> Result<Url, DidError> {
        let mut segments = did.method_specific_id().split(':');
        let host = segments
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DidError::InvalidDocument(format!("{did} has no host")))?
            .replace("%3A", ":")
            .replace("%3a", ":");
        let path: Vec<&str> = segments.collect();
        let raw = if path.is_empty() {
            format!("{}://{host}/.well-known/did.json", self.scheme)
        } else {
            format!("{}://{host}/{}/did.json", self.scheme, path.join("/"))
        };
        Url::parse(&raw).map_err(|e| DidError::InvalidDocument(format!("{did}: {e}")))
    }
}

#[async_trait]
impl DidResolver for WebDidResolver {
    fn method(&self) -> &str {
        "web"
    }

    async fn resolve(&self, did: &Did) -> Result<Option<DidDocument>, DidError> {
        let url = self.document_url(did)?;
        let failed = |reason: String| DidError::ResolutionFailed {
            did: did.to_string(),
            reason,
        };
        tracing::debug!(%did, %url, "fetching did:web document");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| failed(format!("GET {url}: {e}")))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(failed(format!("GET {url}: HTTP {}", resp.status())));
        }
        let doc: DidDocument = resp
            .json()
            .await
            .map_err(|e| failed(format!("invalid document at {url}: {e}")))?;
        Ok(Some(doc))
    }
}

/// Creates `did:web` identifiers under a configured hostname.
pub struct WebDidProvider {
    hostname: String,
    kms: Arc<KeyManager>,
}

impl WebDidProvider {
    /// Create a provider for `hostname` (may include a port).
    pub fn new(hostname: impl Into<String>, kms: Arc<KeyManager>) -> Self {
        Self {
            hostname: hostname.into(),
            kms,
        }
    }

    /// The configured hostname.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

#[async_trait]
impl DidProvider for WebDidProvider {
    fn name(&self) -> &str {
        WEB_PROVIDER
    }

    async fn create(&self, options: &CreateIdentifierOptions) -> Result<Identifier, DidError> {
        let did = web_did(&self.hostname, options.path.as_deref())?;
        let kp = self
            .kms
            .create_key_pair_for_identifier(&did, KeyPurpose::Signing)
            .await?;
        Ok(Identifier {
            controller: did.clone(),
            did,
            keys: vec![IdentifierKey::from_key_pair(&kp, KeyPurpose::Signing)],
            provider: WEB_PROVIDER.to_string(),
            alias: options.alias.clone(),
            created: Timestamp::now(),
        })
    }

    async fn update_keys(
        &self,
        identifier: &Identifier,
        purpose: KeyPurpose,
    ) -> Result<IdentifierKey, DidError> {
        // The document is served by the host, so a new key is published as
        // soon as the identifier record is updated.
        let kp = self
            .kms
            .create_key_pair_for_identifier(&identifier.did, purpose)
            .await?;
        Ok(IdentifierKey::from_key_pair(&kp, purpose))
    }

    async fn deactivate(&self, _identifier: &Identifier) -> Result<(), DidError> {
        Ok(())
    }
}
