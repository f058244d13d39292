//! # vera-crypto: Cryptographic Primitives
//!
//! Provides the cryptographic building blocks for the Vera agent:
//!
//! - **Ed25519** signing and verification for credential, presentation and
//!   token proofs.
//! - **X25519** key agreement keys, published as `keyAgreement` methods.
//! - **Multibase / multicodec** encoding of public keys (`z6Mk...` for
//!   Ed25519, `z6LS...` for X25519) and base58btc proof values.
//!
//! ## Crate Policy
//!
//! - Depends only on `vera-core` internally.
//! - Private key types never implement `Serialize` and print as
//!   `<private>` in `Debug` output.
//! - No mocking of cryptographic operations in tests.

pub mod ed25519;
pub mod error;
pub mod multibase;
pub mod x25519;

pub use ed25519::{verify_with_public_key, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
pub use multibase::{decode_base58btc, decode_multikey, encode_base58btc, encode_multikey, Multicodec};
pub use x25519::{X25519KeyPair, X25519PublicKey};
