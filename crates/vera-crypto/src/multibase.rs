//! # Multibase / Multicodec Key Encoding
//!
//! Public keys in DID documents and `did:key` identifiers are encoded as
//! `z` + base58btc(multicodec varint prefix || raw key bytes).
//!
//! | Key type | Multicodec | Varint prefix | Encoded prefix |
//! |----------|-----------|---------------|----------------|
//! | Ed25519 public key | `0xed` | `0xed 0x01` | `z6Mk` |
//! | X25519 public key | `0xec` | `0xec 0x01` | `z6LS` |
//!
//! Reference: <https://w3c-ccg.github.io/did-method-key/>

use crate::error::CryptoError;

/// Multicodec key types understood by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multicodec {
    /// `ed25519-pub`.
    Ed25519Pub,
    /// `x25519-pub`.
    X25519Pub,
}

impl Multicodec {
    /// The two-byte unsigned-varint prefix.
    pub fn prefix(&self) -> [u8; 2] {
        match self {
            Self::Ed25519Pub => [0xed, 0x01],
            Self::X25519Pub => [0xec, 0x01],
        }
    }

    fn from_prefix(prefix: &[u8]) -> Option<Self> {
        match prefix {
            [0xed, 0x01] => Some(Self::Ed25519Pub),
            [0xec, 0x01] => Some(Self::X25519Pub),
            _ => None,
        }
    }
}

/// Multibase base58btc encoding (`z` prefix).
pub fn encode_base58btc(bytes: &[u8]) -> String {
    format!("z{}", bs58::encode(bytes).into_string())
}

/// Decode a `z`-prefixed base58btc multibase string.
pub fn decode_base58btc(value: &str) -> Result<Vec<u8>, CryptoError> {
    let body = value
        .strip_prefix('z')
        .ok_or_else(|| CryptoError::Encoding(format!("expected base58btc multibase ('z'), got {value:?}")))?;
    bs58::decode(body)
        .into_vec()
        .map_err(|e| CryptoError::Encoding(format!("invalid base58btc: {e}")))
}

/// Encode a raw public key with its multicodec prefix as multibase.
pub fn encode_multikey(codec: Multicodec, key: &[u8; 32]) -> String {
    let mut buf = Vec::with_capacity(34);
    buf.extend_from_slice(&codec.prefix());
    buf.extend_from_slice(key);
    encode_base58btc(&buf)
}

/// Decode a multibase multikey into its codec and 32 raw key bytes.
pub fn decode_multikey(value: &str) -> Result<(Multicodec, [u8; 32]), CryptoError> {
    let bytes = decode_base58btc(value)?;
    if bytes.len() != 34 {
        return Err(CryptoError::Encoding(format!(
            "multikey must decode to 34 bytes, got {}",
            bytes.len()
        )));
    }
    let codec = Multicodec::from_prefix(&bytes[..2])
        .ok_or_else(|| CryptoError::Encoding(format!("unsupported multicodec prefix {:02x?}", &bytes[..2])))?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes[2..]);
    Ok((codec, key))
}
