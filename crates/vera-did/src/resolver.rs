//! # DID Resolver Registry
//!
//! Closed-world dispatch by DID method. An unregistered method fails with
//! [`DidError::UnsupportedMethod`]; there is no fallback resolver. Results
//! are not cached here.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vera_core::{with_timeout, Did};

use crate::document::DidDocument;
use crate::error::DidError;

/// Resolves DIDs of one method.
#[async_trait]
pub trait DidResolver: Send + Sync {
    /// The DID method handled, e.g. `key` or `web`.
    fn method(&self) -> &str;

    /// Resolve a DID. `Ok(None)` means the DID does not exist.
    async fn resolve(&self, did: &Did) -> Result<Option<DidDocument>, DidError>;
}

/// Method → resolver table.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: BTreeMap<String, Arc<dyn DidResolver>>,
    timeout: Option<Duration>,
}

impl ResolverRegistry {
    /// An empty registry with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a deadline to every resolution.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Register a resolver. A second resolver for one method is a
    /// configuration error.
    pub fn register(&mut self, resolver: Arc<dyn DidResolver>) -> Result<(), DidError> {
        let method = resolver.method().to_string();
        if self.resolvers.contains_key(&method) {
            return Err(DidError::DuplicateResolver(method));
        }
        self.resolvers.insert(method, resolver);
        Ok(())
    }

    /// Registered methods, sorted.
    pub fn methods(&self) -> Vec<String> {
        self.resolvers.keys().cloned().collect()
    }

    /// Resolve a DID to its document.
    pub async fn resolve(&self, did: &Did) -> Result<DidDocument, DidError> {
        let resolver = self
            .resolvers
            .get(did.method())
            .ok_or_else(|| DidError::UnsupportedMethod(did.method().to_string()))?;

        let outcome = with_timeout(format!("resolve {did}"), self.timeout, resolver.resolve(did)).await;
        let failed = |reason: String| DidError::ResolutionFailed {
            did: did.to_string(),
            reason,
        };
        match outcome {
            Ok(Some(doc)) if doc.id == *did => Ok(doc),
            Ok(Some(doc)) => Err(failed(format!("document id {} does not match", doc.id))),
            Ok(None) => Err(failed("not found".to_string())),
            Err(e @ DidError::Timeout { .. }) => Err(e),
            Err(e @ DidError::ResolutionFailed { .. }) => Err(e),
            Err(e) => Err(failed(e.to_string())),
        }
    }

    /// Parse and resolve a DID string.
    pub async fn resolve_str(&self, did: &str) -> Result<DidDocument, DidError> {
        self.resolve(&Did::new(did)?).await
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("methods", &self.methods())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        method: &'static str,
        doc: Option<DidDocument>,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl DidResolver for Fixed {
        fn method(&self) -> &str {
            self.method
        }
        async fn resolve(&self, _did: &Did) -> Result<Option<DidDocument>, DidError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(DidError::InvalidDocument("garbage".into()));
            }
            Ok(self.doc.clone())
        }
    }

    fn did(s: &str) -> Did {
        Did::new(s).unwrap()
    }

    fn fixed(method: &'static str, doc: Option<DidDocument>) -> Arc<Fixed> {
        Arc::new(Fixed {
            method,
            doc,
            delay: Duration::ZERO,
            fail: false,
        })
    }

    #[tokio::test]
    async fn dispatches_by_method() {
        let mut reg = ResolverRegistry::new();
        reg.register(fixed("test", Some(DidDocument::new(did("did:test:a"))))).unwrap();
        let doc = reg.resolve(&did("did:test:a")).await.unwrap();
        assert_eq!(doc.id.as_str(), "did:test:a");
    }

    #[tokio::test]
    async fn unregistered_method_is_unsupported() {
        let reg = ResolverRegistry::new();
        let err = reg.resolve(&did("did:ethr:0x1")).await.unwrap_err();
        assert_eq!(err, DidError::UnsupportedMethod("ethr".into()));
    }

    #[tokio::test]
    async fn not_found_and_errors_become_resolution_failed() {
        let mut reg = ResolverRegistry::new();
        reg.register(fixed("none", None)).unwrap();
        reg.register(Arc::new(Fixed {
            method: "bad",
            doc: None,
            delay: Duration::ZERO,
            fail: true,
        }))
        .unwrap();
        assert!(matches!(
            reg.resolve(&did("did:none:x")).await,
            Err(DidError::ResolutionFailed { .. })
        ));
        assert!(matches!(
            reg.resolve(&did("did:bad:x")).await,
            Err(DidError::ResolutionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn mismatched_document_id_is_rejected() {
        let mut reg = ResolverRegistry::new();
        reg.register(fixed("test", Some(DidDocument::new(did("did:test:other"))))).unwrap();
        assert!(matches!(
            reg.resolve(&did("did:test:a")).await,
            Err(DidError::ResolutionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_fails() {
        let mut reg = ResolverRegistry::new();
        reg.register(fixed("test", None)).unwrap();
        assert_eq!(
            reg.register(fixed("test", None)).unwrap_err(),
            DidError::DuplicateResolver("test".into())
        );
    }

    #[tokio::test]
    async fn slow_resolver_times_out() {
        let mut reg = ResolverRegistry::new().with_timeout(Duration::from_millis(10));
        reg.register(Arc::new(Fixed {
            method: "slow",
            doc: None,
            delay: Duration::from_secs(5),
            fail: false,
        }))
        .unwrap();
        assert!(matches!(
            reg.resolve(&did("did:slow:x")).await,
            Err(DidError::Timeout { millis: 10, .. })
        ));
    }
}
