//! # Decentralized Identifiers
//!
//! [`Did`] is a validated W3C DID. Once constructed the value never changes;
//! the type exposes no mutation.
//!
//! Format: `did:<method>:<method-specific-id>` where the method is lowercase
//! alphanumeric and the method-specific id is non-empty. DID URLs
//! (`did:key:z6Mk...#z6Mk...`) are split with [`split_did_url`].
//!
//! Reference: <https://www.w3.org/TR/did-core/#did-syntax>

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// W3C Decentralized Identifier (DID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Create a DID from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDid`] if the string does not
    /// match the `did:method:identifier` format, or if it carries a DID URL
    /// path, query, or fragment.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        Self::method_end(&s).ok_or_else(|| ValidationError::InvalidDid(s.clone()))?;
        if s.contains(['#', '?', '/']) {
            return Err(ValidationError::InvalidDid(s));
        }
        Ok(Self(s))
    }

    /// Byte offset of the colon that ends the method name, if `s` is a DID.
    fn method_end(s: &str) -> Option<usize> {
        let rest = s.strip_prefix("did:")?;
        let pos = rest.find(':')?;
        let method = &rest[..pos];
        let identifier = &rest[pos + 1..];
        let method_ok = !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !method_ok || identifier.is_empty() {
            return None;
        }
        Some(4 + pos)
    }

    /// Access the DID string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the DID method (the part between the first and second colons).
    pub fn method(&self) -> &str {
        let end = Self::method_end(&self.0).unwrap_or(4);
        &self.0[4..end]
    }

    /// Return the method-specific identifier (everything after `did:method:`).
    pub fn method_specific_id(&self) -> &str {
        let end = Self::method_end(&self.0).unwrap_or(self.0.len().saturating_sub(1));
        &self.0[end + 1..]
    }

    /// Build a DID URL pointing at a fragment of this DID's document.
    pub fn with_fragment(&self, fragment: &str) -> String {
        format!("{}#{}", self.0, fragment)
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Did {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl std::str::FromStr for Did {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Split a DID URL into its DID and optional fragment.
///
/// `did:key:z6Mk#z6Mk` → (`did:key:z6Mk`, `Some("z6Mk")`). Paths and queries
/// are dropped; they never identify a verification method here.
pub fn split_did_url(url: &str) -> Result<(Did, Option<&str>), ValidationError> {
    let (base, fragment) = match url.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (url, None),
    };
    let base = base.split(['?', '/']).next().unwrap_or(base);
    Ok((Did::new(base)?, fragment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_dids() {
        for s in [
            "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK",
            "did:web:example.com",
            "did:web:localhost%3A8080",
            "did:ethr:0xabc",
        ] {
            assert!(Did::new(s).is_ok(), "{s}");
        }
    }

    #[test]
    fn invalid_dids() {
        for s in ["", "did:", "did:web", "did::x", "did:Web:x", "urn:web:x", "did:key:x#frag"] {
            assert!(Did::new(s).is_err(), "{s}");
        }
    }

    #[test]
    fn method_and_id() {
        let did = Did::new("did:web:example.com:users:alice").unwrap();
        assert_eq!(did.method(), "web");
        assert_eq!(did.method_specific_id(), "example.com:users:alice");
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<Did, _> = serde_json::from_str("\"did:key:z6Mk\"");
        assert!(ok.is_ok());
        let bad: Result<Did, _> = serde_json::from_str("\"not-a-did\"");
        assert!(bad.is_err());
    }

    #[test]
    fn split_url_with_fragment() {
        let (did, frag) = split_did_url("did:key:z6Mk#key-1").unwrap();
        assert_eq!(did.as_str(), "did:key:z6Mk");
        assert_eq!(frag, Some("key-1"));
    }

    #[test]
    fn split_url_without_fragment() {
        let (did, frag) = split_did_url("did:web:example.com").unwrap();
        assert_eq!(did.as_str(), "did:web:example.com");
        assert!(frag.is_none());
    }

    #[test]
    fn with_fragment_builds_url() {
        let did = Did::new("did:web:example.com").unwrap();
        assert_eq!(did.with_fragment("owner"), "did:web:example.com#owner");
    }
}
