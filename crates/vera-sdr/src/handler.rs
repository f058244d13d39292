//! The sign-SDR action handler.

use std::sync::Arc;

use vera_vc::{CredentialIssuer, JSON_WEB_SIGNATURE_2020};

use crate::error::SdrError;
use crate::request::{ActionSignSdr, SdrRequest};

/// Signs selective disclosure requests as compact tokens.
#[derive(Debug, Clone)]
pub struct SdrActionHandler {
    issuer: Arc<CredentialIssuer>,
    suite_id: String,
}

impl SdrActionHandler {
    /// A handler signing with `JsonWebSignature2020`.
    pub fn new(issuer: Arc<CredentialIssuer>) -> Self {
        Self {
            issuer,
            suite_id: JSON_WEB_SIGNATURE_2020.to_string(),
        }
    }

    /// Sign with another compact-capable suite.
    pub fn with_suite(mut self, suite_id: impl Into<String>) -> Self {
        self.suite_id = suite_id.into();
        self
    }

    /// Build the request and sign it as the action's DID.
    pub async fn handle(&self, action: ActionSignSdr) -> Result<String, SdrError> {
        let request = SdrRequest::from(action);
        request.validate()?;
        let claims = request.to_claims()?;
        let token = self
            .issuer
            .create_signed_token(claims, &request.requester, &self.suite_id)
            .await?;
        tracing::info!(
            requester = %request.requester,
            tag = request.tag.as_deref().unwrap_or_default(),
            claims = request.claims.len(),
            "selective disclosure request signed"
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ClaimRequest;
    use vera_core::Did;
    use vera_did::{
        CreateIdentifierOptions, IdentifierManager, KeyDidProvider, KeyDidResolver, MemoryDidStore,
        ResolverRegistry,
    };
    use vera_kms::{KeyManager, MemoryKeyStore};
    use vera_vc::{JsonWebSignature2020, SuiteRegistry};

    async fn setup() -> (SdrActionHandler, Arc<CredentialIssuer>, Did) {
        let kms = Arc::new(KeyManager::new(Arc::new(MemoryKeyStore::new())));
        let identifiers = Arc::new(
            IdentifierManager::new(Arc::new(MemoryDidStore::new()))
                .with_provider(Arc::new(KeyDidProvider::new(kms.clone())))
                .unwrap(),
        );
        let mut resolver = ResolverRegistry::new();
        resolver.register(Arc::new(KeyDidResolver)).unwrap();
        let suites = SuiteRegistry::new().with(Arc::new(JsonWebSignature2020)).unwrap();
        let did = identifiers
            .create("did:key", &CreateIdentifierOptions::default())
            .await
            .unwrap()
            .did;
        let issuer = Arc::new(CredentialIssuer::new(identifiers, kms, Arc::new(resolver), suites));
        (SdrActionHandler::new(issuer.clone()), issuer, did)
    }

    fn action(did: &Did) -> ActionSignSdr {
        ActionSignSdr::new(
            did.clone(),
            "abc123",
            vec![ClaimRequest::essential("name", "We need this information")],
        )
    }

    #[tokio::test]
    async fn signed_request_verifies_and_reads_back() {
        let (handler, issuer, did) = setup().await;
        let token = handler.handle(action(&did)).await.unwrap();

        let out = issuer.verify_signed_token(&token).await;
        assert!(out.verified, "{:?}", out.reason);
        let req = SdrRequest::from_claims(&out.claims.unwrap()).unwrap();
        assert_eq!(req.requester, did);
        assert_eq!(req.tag.as_deref(), Some("abc123"));
        assert_eq!(req.claims, action(&did).data.claims);
    }

    #[tokio::test]
    async fn only_signature_material_varies() {
        let (handler, issuer, did) = setup().await;
        let a = handler.handle(action(&did)).await.unwrap();
        let b = handler.handle(action(&did)).await.unwrap();
        let mut ca = issuer.verify_signed_token(&a).await.claims.unwrap();
        let mut cb = issuer.verify_signed_token(&b).await.claims.unwrap();
        ca.as_object_mut().unwrap().remove("iat");
        cb.as_object_mut().unwrap().remove("iat");
        assert_eq!(ca, cb);
    }

    #[tokio::test]
    async fn unmanaged_requester_is_an_error() {
        let (handler, _, _) = setup().await;
        let stranger = Did::new("did:web:stranger.example").unwrap();
        let err = handler.handle(action(&stranger)).await.unwrap_err();
        let vera: vera_core::VeraError = err.into();
        assert_eq!(vera.class(), vera_core::ErrorClass::NotFound);
    }

    #[tokio::test]
    async fn suite_without_compact_support_is_an_error() {
        let (handler, _, did) = setup().await;
        let err = handler
            .with_suite("Ed25519Signature2020")
            .handle(action(&did))
            .await
            .unwrap_err();
        assert!(matches!(err, SdrError::Vc(vera_vc::VcError::UnknownSuite(_))));
    }
}
