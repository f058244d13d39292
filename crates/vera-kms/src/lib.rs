//! # vera-kms: Key Custody
//!
//! Creates, stores and uses key material bound to identifiers.
//!
//! - [`KeyStore`] is the backend contract. Generation, lookup and signing
//!   all happen *inside* the store; private material never crosses the
//!   trait boundary.
//! - [`MemoryKeyStore`] keeps keys in process memory (zeroized on drop).
//! - [`EncryptedFileKeyStore`] seals each key with XChaCha20-Poly1305 under
//!   a 32-byte [`MasterKey`] and writes it with a temp-file-then-rename so a
//!   cancelled write never leaves a half-written key.
//! - [`KeyManager`] routes to the configured store, records which key serves
//!   which identifier and purpose, serializes concurrent signing per key, and
//!   applies the configured signing deadline.

pub mod error;
pub mod file;
pub mod manager;
pub mod memory;
pub mod store;
pub mod types;

pub use error::KmsError;
pub use file::{EncryptedFileKeyStore, MasterKey};
pub use manager::KeyManager;
pub use memory::MemoryKeyStore;
pub use store::KeyStore;
pub use types::{KeyId, KeyKind, KeyPair, KeyPurpose, PublicKeyMaterial};
