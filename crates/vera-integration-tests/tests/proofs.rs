//! # Proof properties
//!
//! - Every credential the agent issues verifies, for both suites.
//! - Flipping any single byte of a signature makes verification fail.
//! - Content hashes depend on bytes only, never on provenance.

use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use serde_json::json;
use tokio::runtime::Runtime;
use vera_agent::{compose, AgentConfig, AgentServices};
use vera_core::{sha256_raw, Did};
use vera_crypto::{decode_base58btc, encode_base58btc};
use vera_did::CreateIdentifierOptions;
use vera_msg::{Message, MessageMeta, RawMessage};
use vera_vc::{
    CredentialPayload, VerifiableCredential, ED25519_SIGNATURE_2020, JSON_WEB_SIGNATURE_2020,
};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn setup(rt: &Runtime) -> (AgentServices, Did) {
    rt.block_on(async {
        let services = compose(&AgentConfig::default(), Vec::new()).await.unwrap();
        let issuer = services
            .identifiers
            .create("did:key", &CreateIdentifierOptions::default())
            .await
            .unwrap()
            .did;
        (services, issuer)
    })
}

fn payload(issuer: &Did, name: &str, age: u8) -> CredentialPayload {
    CredentialPayload::new(
        issuer.clone(),
        json!({"id": issuer.to_string(), "name": name, "age": age}),
    )
    .with_context(json!({
        "name": "https://schema.org/name",
        "age": "https://schema.org/age",
    }))
}

async fn issue(
    services: &AgentServices,
    payload: CredentialPayload,
    suite: &str,
) -> VerifiableCredential {
    services
        .issuer
        .create_verifiable_credential(payload, suite)
        .await
        .unwrap()
}

#[test]
fn issued_credentials_verify() {
    let rt = runtime();
    let (services, issuer) = setup(&rt);

    let mut runner = TestRunner::new(Config::with_cases(24));
    runner
        .run(
            &("[A-Za-z][A-Za-z ]{0,23}", any::<u8>(), any::<bool>()),
            |(name, age, jws)| {
                let suite = if jws {
                    JSON_WEB_SIGNATURE_2020
                } else {
                    ED25519_SIGNATURE_2020
                };
                let result = rt.block_on(async {
                    let vc = issue(&services, payload(&issuer, &name, age), suite).await;
                    services.issuer.verify_credential(&vc).await
                });
                prop_assert!(result.verified, "{suite}: {:?}", result.reason);
                Ok(())
            },
        )
        .unwrap();
}

#[test]
fn any_flipped_signature_byte_fails() {
    let rt = runtime();
    let (services, issuer) = setup(&rt);
    let vc = rt.block_on(issue(
        &services,
        payload(&issuer, "Alice", 30),
        ED25519_SIGNATURE_2020,
    ));
    let signature = decode_base58btc(vc.proof.proof_value.as_deref().unwrap()).unwrap();
    assert_eq!(signature.len(), 64);

    let mut runner = TestRunner::new(Config::with_cases(64));
    runner
        .run(&(0usize..64, 1u8..=255), |(index, mask)| {
            let mut flipped = signature.clone();
            flipped[index] ^= mask;
            let mut tampered = vc.clone();
            tampered.proof.proof_value = Some(encode_base58btc(&flipped));
            let result = rt.block_on(services.issuer.verify_credential(&tampered));
            prop_assert!(!result.verified, "byte {index} ^ {mask:#04x} still verified");
            Ok(())
        })
        .unwrap();
}

#[test]
fn altered_claims_fail_for_both_suites() {
    let rt = runtime();
    let (services, issuer) = setup(&rt);
    for suite in [ED25519_SIGNATURE_2020, JSON_WEB_SIGNATURE_2020] {
        let mut vc = rt.block_on(issue(&services, payload(&issuer, "Alice", 30), suite));
        vc.credential.credential_subject["name"] = json!("Mallory");
        let result = rt.block_on(services.issuer.verify_credential(&vc));
        assert!(!result.verified, "{suite}");
    }
}

proptest! {
    #[test]
    fn hash_ignores_provenance(raw in ".{1,64}", source in "[a-z]{1,8}", id in "[a-z.]{1,16}") {
        let a = Message::new(RawMessage::new(raw.clone(), MessageMeta::new("httpsPost", "host/didcomm")));
        let b = Message::new(RawMessage::new(raw.clone(), MessageMeta::new(source, id)));
        prop_assert_eq!(a.hash, b.hash);
        prop_assert_eq!(a.hash, sha256_raw(raw.as_bytes()));
    }
}
