//! # vera-vc: Verifiable Credentials
//!
//! Issues and verifies W3C verifiable credentials and presentations, and
//! compact signed tokens for session artifacts.
//!
//! - [`ContextRegistry`]: resolves `@context` and expands every term before
//!   canonicalization. Fails closed on unknown contexts and undefined terms.
//! - [`SuiteRegistry`] of [`ProofSuite`]s: [`Ed25519Signature2020`] and
//!   [`JsonWebSignature2020`] ship here. There is no default suite.
//! - [`CredentialIssuer`]: issuance through key custody, verification
//!   against the signer's resolved DID document.
//!
//! ## Security Invariants
//!
//! - Signing input is always built from [`CanonicalBytes`](vera_core::CanonicalBytes)
//!   of the *expanded* document, never from raw serialization.
//! - Private keys stay in key custody; suites only see a [`Signer`].
//! - Verification reports failure as a [`VerificationResult`], never as an
//!   error, and compares presentation challenges in constant time.

pub mod context;
pub mod credential;
pub mod ed25519_2020;
pub mod error;
pub mod issuer;
pub mod jws_2020;
pub mod proof;
pub mod signer;
pub mod suite;

pub use context::{
    ContextDefinition, ContextRegistry, CREDENTIALS_V1_CONTEXT, DID_V1_CONTEXT,
    ED25519_2020_CONTEXT, JWS_2020_CONTEXT,
};
pub use credential::{
    CredentialPayload, PresentationPayload, VerifiableCredential, VerifiablePresentation,
    VERIFIABLE_CREDENTIAL, VERIFIABLE_PRESENTATION,
};
pub use ed25519_2020::{Ed25519Signature2020, ED25519_SIGNATURE_2020};
pub use error::VcError;
pub use issuer::{CredentialIssuer, TokenVerification, VerificationResult};
pub use jws_2020::{decode_compact, looks_compact, JsonWebSignature2020, EDDSA, JSON_WEB_SIGNATURE_2020};
pub use proof::{Proof, ProofOptions, ProofPurpose};
pub use signer::KmsSigner;
pub use suite::{CompactToken, ProofSuite, Signer, SuiteRegistry};
