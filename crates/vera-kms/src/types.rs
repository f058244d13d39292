//! Public key custody types. None of these carry private material.

use serde::{Deserialize, Serialize};
use vera_crypto::{encode_multikey, Multicodec};

/// Opaque key identifier. Stores use the lowercase hex public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    /// Wrap a key id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Key algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    /// Ed25519 signing key.
    Ed25519,
    /// X25519 key agreement key.
    X25519,
}

impl KeyKind {
    /// Whether keys of this kind can sign.
    pub fn can_sign(&self) -> bool {
        matches!(self, Self::Ed25519)
    }

    fn multicodec(&self) -> Multicodec {
        match self {
            Self::Ed25519 => Multicodec::Ed25519Pub,
            Self::X25519 => Multicodec::X25519Pub,
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "Ed25519"),
            Self::X25519 => write!(f, "X25519"),
        }
    }
}

/// What an identifier uses a key for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPurpose {
    /// Proofs and tokens.
    Signing,
    /// Key agreement for inbound encryption.
    Encryption,
}

impl KeyPurpose {
    /// The key kind minted for this purpose.
    pub fn default_kind(&self) -> KeyKind {
        match self {
            Self::Signing => KeyKind::Ed25519,
            Self::Encryption => KeyKind::X25519,
        }
    }
}

impl std::fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signing => write!(f, "signing"),
            Self::Encryption => write!(f, "encryption"),
        }
    }
}

/// Public key renderings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyMaterial {
    /// Lowercase hex of the raw 32 bytes.
    pub public_key_hex: String,
    /// Multicodec-prefixed base58btc (`z6Mk...` / `z6LS...`).
    pub public_key_multibase: String,
}

impl PublicKeyMaterial {
    /// Render raw public key bytes of the given kind.
    pub fn new(kind: KeyKind, raw: &[u8; 32]) -> Self {
        Self {
            public_key_hex: vera_crypto::ed25519::bytes_to_hex(raw),
            public_key_multibase: encode_multikey(kind.multicodec(), raw),
        }
    }
}

/// A managed key as seen outside the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    /// Key identifier.
    pub key_id: KeyId,
    /// Algorithm.
    pub kind: KeyKind,
    /// Public half.
    #[serde(flatten)]
    pub public_key: PublicKeyMaterial,
    /// Name of the store holding the private half.
    pub store: String,
}

impl KeyPair {
    /// Build the public view of a freshly generated key.
    pub fn new(kind: KeyKind, raw_public: &[u8; 32], store: &str) -> Self {
        let public_key = PublicKeyMaterial::new(kind, raw_public);
        Self {
            key_id: KeyId::new(public_key.public_key_hex.clone()),
            kind,
            public_key,
            store: store.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_pair_serializes_flat_camel_case() {
        let kp = KeyPair::new(KeyKind::Ed25519, &[1u8; 32], "memory");
        let v = serde_json::to_value(&kp).unwrap();
        assert_eq!(v["keyId"], v["publicKeyHex"]);
        assert_eq!(v["kind"], "Ed25519");
        assert!(v["publicKeyMultibase"].as_str().unwrap().starts_with("z6Mk"));
        assert_eq!(v["store"], "memory");
    }

    #[test]
    fn purpose_maps_to_kind() {
        assert_eq!(KeyPurpose::Signing.default_kind(), KeyKind::Ed25519);
        assert_eq!(KeyPurpose::Encryption.default_kind(), KeyKind::X25519);
        assert!(!KeyKind::X25519.can_sign());
    }
}
