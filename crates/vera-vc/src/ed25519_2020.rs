//! `Ed25519Signature2020`: linked-data proof with a base58btc multibase
//! `proofValue`.

use async_trait::async_trait;
use vera_core::CanonicalBytes;
use vera_crypto::{
    decode_base58btc, encode_base58btc, verify_with_public_key, Ed25519PublicKey, Ed25519Signature,
};

use crate::error::VcError;
use crate::proof::{Proof, ProofOptions};
use crate::suite::{linked_data_signing_input, ProofSuite, Signer};

/// Suite id.
pub const ED25519_SIGNATURE_2020: &str = "Ed25519Signature2020";

/// The `Ed25519Signature2020` suite.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Signature2020;

#[async_trait]
impl ProofSuite for Ed25519Signature2020 {
    fn id(&self) -> &str {
        ED25519_SIGNATURE_2020
    }

    async fn issue(
        &self,
        document: &CanonicalBytes,
        options: ProofOptions,
        signer: &dyn Signer,
    ) -> Result<Proof, VcError> {
        let input = linked_data_signing_input(ED25519_SIGNATURE_2020, &options, document)?;
        let signature = signer.sign(&input).await?;
        let mut proof = Proof::unsigned(ED25519_SIGNATURE_2020, options);
        proof.proof_value = Some(encode_base58btc(&signature));
        Ok(proof)
    }

    fn verify(
        &self,
        document: &CanonicalBytes,
        proof: &Proof,
        key: &Ed25519PublicKey,
    ) -> Result<(), VcError> {
        if proof.proof_type != ED25519_SIGNATURE_2020 {
            return Err(VcError::ProofInvalid(format!(
                "expected {ED25519_SIGNATURE_2020}, got {}",
                proof.proof_type
            )));
        }
        let value = proof
            .proof_value
            .as_deref()
            .ok_or_else(|| VcError::ProofInvalid("proof has no proofValue".into()))?;
        let raw = decode_base58btc(value).map_err(|e| VcError::ProofInvalid(e.to_string()))?;
        let signature =
            Ed25519Signature::from_slice(&raw).map_err(|e| VcError::ProofInvalid(e.to_string()))?;
        let input = linked_data_signing_input(ED25519_SIGNATURE_2020, &proof.options, document)?;
        verify_with_public_key(&input, &signature, key)
            .map_err(|e| VcError::ProofInvalid(e.to_string()))
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
            "did:key:z6Mk#z6Mk"
        }
        async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, VcError> {
            Ok(self.0.sign(payload).as_bytes().to_vec())
        }
    }

    fn doc(s: &str) -> CanonicalBytes {
        CanonicalBytes::new(&serde_json::json!({ "claim": s })).unwrap()
    }

    #[tokio::test]
    async fn issue_then_verify() {
        let signer = LocalSigner(Ed25519KeyPair::generate());
        let options = ProofOptions::new(signer.verification_method(), ProofPurpose::AssertionMethod);
        let proof = Ed25519Signature2020
            .issue(&doc("a"), options, &signer)
            .await
            .unwrap();
        assert!(proof.proof_value.as_deref().unwrap().starts_with('z'));
        Ed25519Signature2020
            .verify(&doc("a"), &proof, &signer.0.public_key())
            .unwrap();
    }

    #[tokio::test]
    async fn document_or_options_change_breaks_proof() {
        let signer = LocalSigner(Ed25519KeyPair::generate());
        let options = ProofOptions::new(signer.verification_method(), ProofPurpose::AssertionMethod);
        let proof = Ed25519Signature2020
            .issue(&doc("a"), options, &signer)
            .await
            .unwrap();
        let pk = signer.0.public_key();

        assert!(Ed25519Signature2020.verify(&doc("b"), &proof, &pk).is_err());

        let mut repurposed = proof.clone();
        repurposed.options.proof_purpose = ProofPurpose::Authentication;
        assert!(Ed25519Signature2020.verify(&doc("a"), &repurposed, &pk).is_err());

        let mut challenged = proof;
        challenged.options.challenge = Some("nonce".into());
        assert!(Ed25519Signature2020.verify(&doc("a"), &challenged, &pk).is_err());
    }

    #[test]
    fn missing_or_garbled_value_is_invalid() {
        let pk = Ed25519KeyPair::generate().public_key();
        let options = ProofOptions::new("did:key:z#z", ProofPurpose::AssertionMethod);
        let mut proof = Proof::unsigned(ED25519_SIGNATURE_2020, options);
        assert!(matches!(
            Ed25519Signature2020.verify(&doc("a"), &proof, &pk),
            Err(VcError::ProofInvalid(_))
        ));
        proof.proof_value = Some("z0OIl".into());
        assert!(matches!(
            Ed25519Signature2020.verify(&doc("a"), &proof, &pk),
            Err(VcError::ProofInvalid(_))
        ));
    }
}
