//! X25519 key agreement keys.
//!
//! Identifiers publish an X25519 key as their `keyAgreement` method so that
//! peers can encrypt to them. The agent core only generates and stores these
//! keys; message encryption itself lives outside the core.

use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::ed25519::{bytes_to_hex, hex_to_bytes};
use crate::error::CryptoError;

/// An X25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create a public key from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::KeyError(format!("X25519 public key must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Return the raw 32-byte public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the public key as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }

    /// Parse a public key from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex_to_bytes(hex.trim()).map_err(CryptoError::KeyError)?;
        Self::from_slice(&bytes)
    }
}

/// An X25519 static key pair.
pub struct X25519KeyPair {
    secret: StaticSecret,
}

impl X25519KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(rand_core::OsRng),
        }
    }

    /// Restore a key pair from its 32 secret bytes.
    pub fn from_secret(bytes: [u8; 32]) -> Self {
        Self {
            secret: StaticSecret::from(bytes),
        }
    }

    /// The secret scalar, for persistence by a key store only.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// The public half.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(PublicKey::from(&self.secret).to_bytes())
    }

    /// Compute the shared secret with a peer's public key.
    pub fn diffie_hellman(&self, peer: &X25519PublicKey) -> Zeroizing<[u8; 32]> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(peer.0));
        Zeroizing::new(shared.to_bytes())
    }
}

impl std::fmt::Debug for X25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "X25519KeyPair(<private>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agreement_is_symmetric() {
        let alice = X25519KeyPair::generate();
        let bob = X25519KeyPair::generate();
        assert_eq!(
            *alice.diffie_hellman(&bob.public_key()),
            *bob.diffie_hellman(&alice.public_key())
        );
    }

    #[test]
    fn restore_from_secret() {
        let kp = X25519KeyPair::generate();
        let restored = X25519KeyPair::from_secret(*kp.secret_bytes());
        assert_eq!(kp.public_key(), restored.public_key());
    }

    #[test]
    fn hex_roundtrip() {
        let pk = X25519KeyPair::generate().public_key();
        assert_eq!(X25519PublicKey::from_hex(&pk.to_hex()).unwrap(), pk);
    }
}
