//! Managed identifiers.

use serde::{Deserialize, Serialize};
use vera_core::{Did, Timestamp};
use vera_kms::{KeyId, KeyKind, KeyPair, KeyPurpose};

/// A key attached to an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierKey {
    /// Key custody id.
    pub key_id: KeyId,
    /// Algorithm.
    pub kind: KeyKind,
    /// What the identifier uses it for.
    pub purpose: KeyPurpose,
    /// Lowercase hex public key.
    pub public_key_hex: String,
    /// Multicodec multibase public key.
    pub public_key_multibase: String,
}

impl IdentifierKey {
    /// Attach a custody key for `purpose`.
    pub fn from_key_pair(kp: &KeyPair, purpose: KeyPurpose) -> Self {
        Self {
            key_id: kp.key_id.clone(),
            kind: kp.kind,
            purpose,
            public_key_hex: kp.public_key.public_key_hex.clone(),
            public_key_multibase: kp.public_key.public_key_multibase.clone(),
        }
    }
}

/// A DID managed by this agent.
///
/// The `did` value never changes after creation; only `keys` may grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    /// The DID.
    pub did: Did,
    /// Controlling DID (the DID itself for both built-in providers).
    pub controller: Did,
    /// Associated keys in the order they were added.
    pub keys: Vec<IdentifierKey>,
    /// Name of the provider that created it, e.g. `did:key`.
    pub provider: String,
    /// Optional human label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Creation time.
    pub created: Timestamp,
}

impl Identifier {
    /// The first key usable for signing.
    pub fn signing_key(&self) -> Option<&IdentifierKey> {
        self.keys
            .iter()
            .find(|k| k.purpose == KeyPurpose::Signing && k.kind.can_sign())
    }

    /// The first key agreement key.
    pub fn encryption_key(&self) -> Option<&IdentifierKey> {
        self.keys.iter().find(|k| k.purpose == KeyPurpose::Encryption)
    }

    /// The DID URL naming `key` as a verification method of this identifier.
    pub fn verification_method_id(&self, key: &IdentifierKey) -> String {
        self.did.with_fragment(&key.public_key_multibase)
    }
}

/// Options accepted by [`DidProvider::create`](crate::DidProvider::create).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdentifierOptions {
    /// Human label stored with the identifier.
    #[serde(default)]
    pub alias: Option<String>,
    /// Path below the host for `did:web` (`users/alice` → `did:web:host:users:alice`).
    #[serde(default)]
    pub path: Option<String>,
}
