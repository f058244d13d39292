//! # `JsonWebSignature2020`
//!
//! Linked-data proofs carry a detached EdDSA JWS (`b64: false`, RFC 7797):
//! the protected header is base64url-encoded, the payload is the raw
//! linked-data signing input and is left out of the serialized `jws`.
//!
//! The suite also issues compact JWTs (`header.payload.signature`) for
//! session artifacts such as selective disclosure requests. Claims are
//! encoded as canonical JSON so identical claims yield identical payloads.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use vera_core::CanonicalBytes;
use vera_crypto::{verify_with_public_key, Ed25519PublicKey, Ed25519Signature};

use crate::error::VcError;
use crate::proof::{Proof, ProofOptions};
use crate::suite::{linked_data_signing_input, CompactToken, ProofSuite, Signer};

/// Suite id.
pub const JSON_WEB_SIGNATURE_2020: &str = "JsonWebSignature2020";

/// JOSE algorithm for Ed25519.
pub const EDDSA: &str = "EdDSA";

/// The `JsonWebSignature2020` suite.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWebSignature2020;

fn detached_header() -> Value {
    json!({"alg": EDDSA, "b64": false, "crit": ["b64"]})
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn unb64(part: &str, what: &str) -> Result<Vec<u8>, VcError> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|e| VcError::Malformed(format!("{what} is not base64url: {e}")))
}

fn decode_json_part(part: &str, what: &str) -> Result<Value, VcError> {
    let bytes = unb64(part, what)?;
    serde_json::from_slice(&bytes).map_err(|e| VcError::Malformed(format!("{what} is not JSON: {e}")))
}

fn check_signature(input: &[u8], signature: &[u8], key: &Ed25519PublicKey) -> Result<(), VcError> {
    let sig = Ed25519Signature::from_slice(signature).map_err(|e| VcError::ProofInvalid(e.to_string()))?;
    verify_with_public_key(input, &sig, key).map_err(|e| VcError::ProofInvalid(e.to_string()))
}

/// Split a compact JWS into header, claims and signature without checking
/// the signature.
pub fn decode_compact(token: &str) -> Result<CompactToken, VcError> {
    let mut parts = token.split('.');
    let (Some(h), Some(p), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(VcError::Malformed("compact token must have three parts".into()));
    };
    let header = decode_json_part(h, "token header")?;
    let claims = decode_json_part(p, "token payload")?;
    if !claims.is_object() {
        return Err(VcError::Malformed("token claims must be an object".into()));
    }
    Ok(CompactToken {
        header,
        claims,
        signing_input: format!("{h}.{p}"),
        signature: unb64(s, "token signature")?,
    })
}

/// Whether `s` has the shape of a compact JWS. Cheap structural test used
/// to classify inbound payloads.
pub fn looks_compact(s: &str) -> bool {
    let parts: Vec<&str> = s.trim().split('.').collect();
    parts.len() == 3
        && parts.iter().all(|p| {
            !p.is_empty()
                && p.bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

#[async_trait]
impl ProofSuite for JsonWebSignature2020 {
    fn id(&self) -> &str {
        JSON_WEB_SIGNATURE_2020
    }

    async fn issue(
        &self,
        document: &CanonicalBytes,
        options: ProofOptions,
        signer: &dyn Signer,
    ) -> Result<Proof, VcError> {
        let header = b64(CanonicalBytes::new(&detached_header())?.as_bytes());
        let payload = linked_data_signing_input(JSON_WEB_SIGNATURE_2020, &options, document)?;
        let mut input = Vec::with_capacity(header.len() + 1 + payload.len());
        input.extend_from_slice(header.as_bytes());
        input.push(b'.');
        input.extend_from_slice(&payload);

        let signature = signer.sign(&input).await?;
        let mut proof = Proof::unsigned(JSON_WEB_SIGNATURE_2020, options);
        proof.jws = Some(format!("{header}..{}", b64(&signature)));
        Ok(proof)
    }

    fn verify(
        &self,
        document: &CanonicalBytes,
        proof: &Proof,
        key: &Ed25519PublicKey,
    ) -> Result<(), VcError> {
        if proof.proof_type != JSON_WEB_SIGNATURE_2020 {
            return Err(VcError::ProofInvalid(format!(
                "expected {JSON_WEB_SIGNATURE_2020}, got {}",
                proof.proof_type
            )));
        }
        let jws = proof
            .jws
            .as_deref()
            .ok_or_else(|| VcError::ProofInvalid("proof has no jws".into()))?;
        let mut parts = jws.split('.');
        let (Some(h), Some(""), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VcError::ProofInvalid("jws must be detached (header..signature)".into()));
        };

        let header = decode_json_part(h, "jws header").map_err(|e| VcError::ProofInvalid(e.to_string()))?;
        if header.get("alg").and_then(Value::as_str) != Some(EDDSA) {
            return Err(VcError::ProofInvalid(format!("unsupported jws alg in {header}")));
        }
        if header.get("b64") != Some(&Value::Bool(false)) {
            return Err(VcError::ProofInvalid("jws must use an unencoded payload".into()));
        }

        let payload = linked_data_signing_input(JSON_WEB_SIGNATURE_2020, &proof.options, document)?;
        let mut input = Vec::with_capacity(h.len() + 1 + payload.len());
        input.extend_from_slice(h.as_bytes());
        input.push(b'.');
        input.extend_from_slice(&payload);

        let signature = unb64(s, "jws signature").map_err(|e| VcError::ProofInvalid(e.to_string()))?;
        check_signature(&input, &signature, key)
    }

    fn compact_alg(&self) -> Option<&str> {
        Some(EDDSA)
    }

    async fn sign_compact(&self, claims: &Value, signer: &dyn Signer) -> Result<String, VcError> {
        if !claims.is_object() {
            return Err(VcError::Malformed("token claims must be an object".into()));
        }
        let header = json!({"alg": EDDSA, "typ": "JWT", "kid": signer.verification_method()});
        let h = b64(CanonicalBytes::new(&header)?.as_bytes());
        let p = b64(CanonicalBytes::new(claims)?.as_bytes());
        let input = format!("{h}.{p}");
        let signature = signer.sign(input.as_bytes()).await?;
        Ok(format!("{input}.{}", b64(&signature)))
    }

    fn verify_compact(&self, token: &CompactToken, key: &Ed25519PublicKey) -> Result<(), VcError> {
        if token.header.get("alg").and_then(Value::as_str) != Some(EDDSA) {
            return Err(VcError::ProofInvalid("token alg is not EdDSA".into()));
        }
        check_signature(token.signing_input.as_bytes(), &token.signature, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::ProofPurpose;
    use vera_crypto::Ed25519KeyPair;

    struct LocalSigner(Ed25519KeyPair);

    #[async_trait]
    impl Signer for LocalSigner {
        fn verification_method(&self) -> &str {
            "did:key:z6MkHolder#z6MkHolder"
        }
        async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, VcError> {
            Ok(self.0.sign(payload).as_bytes().to_vec())
        }
    }

    fn doc() -> CanonicalBytes {
        CanonicalBytes::new(&json!({"a": 1})).unwrap()
    }

    #[tokio::test]
    async fn detached_jws_roundtrip() {
        let signer = LocalSigner(Ed25519KeyPair::generate());
        let options = ProofOptions::new(signer.verification_method(), ProofPurpose::Authentication)
            .with_challenge("abc123");
        let proof = JsonWebSignature2020.issue(&doc(), options, &signer).await.unwrap();
        let jws = proof.jws.as_deref().unwrap();
        assert!(jws.contains(".."));
        assert!(proof.proof_value.is_none());
        JsonWebSignature2020
            .verify(&doc(), &proof, &signer.0.public_key())
            .unwrap();
    }

    #[tokio::test]
    async fn attached_payload_is_rejected() {
        let signer = LocalSigner(Ed25519KeyPair::generate());
        let options = ProofOptions::new(signer.verification_method(), ProofPurpose::Authentication);
        let mut proof = JsonWebSignature2020.issue(&doc(), options, &signer).await.unwrap();
        let jws = proof.jws.take().unwrap().replacen("..", ".eyJ9.", 1);
        proof.jws = Some(jws);
        assert!(matches!(
            JsonWebSignature2020.verify(&doc(), &proof, &signer.0.public_key()),
            Err(VcError::ProofInvalid(_))
        ));
    }

    #[tokio::test]
    async fn compact_token_roundtrip() {
        let signer = LocalSigner(Ed25519KeyPair::generate());
        let claims = json!({"type": "sdr", "iss": "did:key:z6MkHolder", "tag": "abc"});
        let token = JsonWebSignature2020.sign_compact(&claims, &signer).await.unwrap();
        assert!(looks_compact(&token));

        let decoded = decode_compact(&token).unwrap();
        assert_eq!(decoded.claims, claims);
        assert_eq!(decoded.key_id(), Some("did:key:z6MkHolder#z6MkHolder"));
        assert_eq!(decoded.issuer(), Some("did:key:z6MkHolder"));
        JsonWebSignature2020
            .verify_compact(&decoded, &signer.0.public_key())
            .unwrap();

        let other = Ed25519KeyPair::generate().public_key();
        assert!(JsonWebSignature2020.verify_compact(&decoded, &other).is_err());
    }

    #[test]
    fn compact_shape_detection() {
        assert!(!looks_compact("{\"a\":1}"));
        assert!(!looks_compact("a.b"));
        assert!(!looks_compact("a..c"));
        assert!(looks_compact("eyJh.eyJi.c2ln"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_compact("a.b").is_err());
        assert!(decode_compact("!!.??.**").is_err());
        let not_object = format!("{}.{}.{}", b64(b"{}"), b64(b"[1]"), b64(b"sig"));
        assert!(decode_compact(&not_object).is_err());
    }
}
