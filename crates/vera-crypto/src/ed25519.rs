//! # Ed25519
//!
//! Key generation, signing and strict verification for credential,
//! presentation and compact-token proofs.
//!
//! Private keys never leave [`Ed25519KeyPair`] except through
//! [`Ed25519KeyPair::seed`], which returns a zeroizing buffer for the key
//! store that persists it. Proof suites decide which bytes are signed; this
//! module signs exactly what it is handed.

use ed25519_dalek::Signer;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Raw 32-byte Ed25519 verification key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// Raw 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// Signing half of an Ed25519 key.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Ed25519PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Length-checked conversion, used when decoding multibase or JWK keys.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        <[u8; 32]>::try_from(bytes).map(Self).map_err(|_| {
            CryptoError::KeyError(format!("expected 32 key bytes, got {}", bytes.len()))
        })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }

    /// Accepts exactly 64 hex digits, either case, surrounding whitespace ignored.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.trim();
        if hex.len() != 64 {
            return Err(CryptoError::KeyError(format!(
                "expected 64 hex digits for a public key, got {}",
                hex.len()
            )));
        }
        Self::from_slice(&hex_to_bytes(hex).map_err(CryptoError::KeyError)?)
    }

    fn verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("not a curve point: {e}")))
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Ed25519PublicKey").field(&self.to_hex()).finish()
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Ed25519Signature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Length-checked conversion from a decoded `proofValue` or JWS segment.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        <[u8; 64]>::try_from(bytes).map(Self).map_err(|_| {
            CryptoError::VerificationFailed(format!(
                "expected 64 signature bytes, got {}",
                bytes.len()
            ))
        })
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Eight hex digits are enough to tell signatures apart in logs.
        write!(f, "Ed25519Signature({}..)", bytes_to_hex(&self.0[..4]))
    }
}

impl Ed25519KeyPair {
    /// Fresh key from the operating system RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut rand_core::OsRng),
        }
    }

    /// Rebuild a key from a persisted seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The private seed, for persistence by a key store only.
    pub fn seed(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Ed25519KeyPair(<private>)")
    }
}

/// Check `signature` over `message` against `public_key`.
///
/// Verification is strict: small-order keys and non-canonical signatures
/// are refused.
pub fn verify_with_public_key(
    message: &[u8],
    signature: &Ed25519Signature,
    public_key: &Ed25519PublicKey,
) -> Result<(), CryptoError> {
    let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
    public_key
        .verifying_key()?
        .verify_strict(message, &signature)
        .map_err(|e| CryptoError::VerificationFailed(format!("signature mismatch: {e}")))
}

/// Lowercase hex rendering shared by the key types and key stores.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Inverse of [`bytes_to_hex`]; either case is accepted.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, String> {
    fn nibble(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            b'A'..=b'F' => Some(c - b'A' + 10),
            _ => None,
        }
    }

    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }
    digits
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| match (nibble(pair[0]), nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
            _ => Err(format!("invalid hex digit near offset {}", i * 2)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify_only_for_their_key_and_message() {
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let sig = alice.sign(b"hello");

        verify_with_public_key(b"hello", &sig, &alice.public_key()).unwrap();
        assert!(verify_with_public_key(b"hello", &sig, &bob.public_key()).is_err());
        assert!(verify_with_public_key(b"hellO", &sig, &alice.public_key()).is_err());
    }

    #[test]
    fn seed_rebuilds_the_same_key() {
        let seed = [42u8; 32];
        let a = Ed25519KeyPair::from_seed(&seed);
        let b = Ed25519KeyPair::from_seed(&a.seed());
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"x"), b.sign(b"x"));
    }

    #[test]
    fn public_key_hex() {
        let pk = Ed25519KeyPair::generate().public_key();
        let hex = pk.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Ed25519PublicKey::from_hex(&hex.to_uppercase()).unwrap(), pk);
        assert!(Ed25519PublicKey::from_hex("abc").is_err());
        assert!(Ed25519PublicKey::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(bytes_to_hex(&[0x00, 0xab, 0xff]), "00abff");
        assert_eq!(hex_to_bytes("00ABff").unwrap(), vec![0x00, 0xab, 0xff]);
        assert!(hex_to_bytes("0").is_err());
        assert!(hex_to_bytes("é0").is_err());
    }

    #[test]
    fn slices_are_length_checked() {
        assert!(Ed25519Signature::from_slice(&[0u8; 63]).is_err());
        assert!(Ed25519Signature::from_slice(&[0u8; 64]).is_ok());
        assert!(Ed25519PublicKey::from_slice(&[0u8; 33]).is_err());
    }

    #[test]
    fn debug_hides_the_seed() {
        let kp = Ed25519KeyPair::from_seed(&[7u8; 32]);
        assert_eq!(format!("{kp:?}"), "Ed25519KeyPair(<private>)");
    }
}
