//! # Login Flow Tests for Sign-In with Ethereum (qc-18)
//!
//! End-to-end runs of issue → sign → verify against the in-memory store.
//!
//! ## Test Categories
//!
//! 1. **Acceptance** - Known-answer login, fresh-key logins
//! 2. **Replay** - Sequential and concurrent double-submit
//! 3. **Binding** - Domain, nonce, chain
//! 4. **Time Window** - Expiry and not-before boundaries
//! 5. **Tampering** - Byte flips in text and signature
//! 6. **Infrastructure** - Store failures surface as errors, not verdicts

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, Scalar};
use qc_18_siwe_auth::{
    Address, AuthConfig, AuthError, ConsumeOutcome, InMemoryNonceStore, Message, NonceEntry,
    NonceStore, RejectionReason, SiweAuthApi, SiweAuthService, SiweSignature, StoreError,
    VerificationResult,
};
use shared_crypto::Secp256k1KeyPair;
use std::sync::Arc;

// =============================================================================
// TEST HELPERS
// =============================================================================

const KAT_MESSAGE: &str = "example.com wants you to sign in with your Ethereum account:
0x14791697260E4c9A71f18484C9f997B308e59325

Sign in to the example dapp.

URI: https://example.com/login
Version: 1
Chain ID: 1
Nonce: ab12cd34
Issued At: 2024-01-01T00:00:00Z";

const KAT_SIGNATURE: &str = "0xe0a7ed54d44e31fdc945a6c20769612c71aee5a0803fc8da6bc7fa438b183b90\
                             36b1e0b55eaeec67b7f1eb9eabcbad442d3c82d07562aa6ac99da405b05efd131b";

type Service = SiweAuthService<Arc<InMemoryNonceStore>>;

fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

fn make_service() -> Service {
    SiweAuthService::new(
        AuthConfig::new("example.com"),
        Arc::new(InMemoryNonceStore::new()),
    )
    .unwrap()
}

async fn register(service: &Service, nonce: &str, issued_at: DateTime<Utc>) {
    assert!(service
        .store()
        .register(NonceEntry::new(nonce, issued_at))
        .await
        .unwrap());
}

fn address_of(keypair: &Secp256k1KeyPair) -> Address {
    Address::from_bytes(keypair.address())
}

fn sign(keypair: &Secp256k1KeyPair, text: &str) -> String {
    let signature = keypair.sign_personal_message(text.as_bytes()).unwrap();
    SiweSignature::from(signature).to_hex()
}

fn login_message(keypair: &Secp256k1KeyPair, nonce: &str, issued_at: DateTime<Utc>) -> Message {
    Message::builder(
        "example.com",
        address_of(keypair),
        "https://example.com/login",
        1,
        nonce,
        issued_at,
    )
    .statement("Sign in to the example dapp.")
    .build()
    .unwrap()
}

fn rejection(result: VerificationResult) -> RejectionReason {
    match result {
        VerificationResult::Rejected { reason } => reason,
        VerificationResult::Accepted { address } => panic!("unexpectedly accepted {address}"),
    }
}

/// Store whose backend is down.
struct UnavailableStore;

#[async_trait]
impl NonceStore for UnavailableStore {
    async fn register(&self, _entry: NonceEntry) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn lookup(&self, _nonce: &str) -> Result<Option<NonceEntry>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn consume(&self, _nonce: &str) -> Result<ConsumeOutcome, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

// =============================================================================
// ACCEPTANCE AND REPLAY
// =============================================================================

#[tokio::test]
async fn test_known_answer_login_then_replay() {
    let service = make_service();
    let issued = at("2024-01-01T00:00:00Z");
    register(&service, "ab12cd34", issued).await;
    let claims = service.expected_claims("ab12cd34");
    let now = issued + Duration::seconds(30);

    let first = service
        .verify(KAT_MESSAGE, KAT_SIGNATURE, &claims, now)
        .await
        .unwrap();
    let expected: Address = "0x14791697260E4c9A71f18484C9f997B308e59325".parse().unwrap();
    assert_eq!(first, VerificationResult::Accepted { address: expected });

    let second = service
        .verify(KAT_MESSAGE, KAT_SIGNATURE, &claims, now)
        .await
        .unwrap();
    assert_eq!(rejection(second), RejectionReason::NonceReplay);

    let entry = service.store().lookup("ab12cd34").await.unwrap().unwrap();
    assert!(entry.consumed);
}

#[tokio::test]
async fn test_issued_nonce_login() {
    let service = make_service();
    let keypair = Secp256k1KeyPair::generate();

    let nonce = service.issue_nonce().await.unwrap();
    let text = login_message(&keypair, &nonce, Utc::now()).to_string();
    let signature = sign(&keypair, &text);

    let result = service
        .verify(&text, &signature, &service.expected_claims(&nonce), Utc::now())
        .await
        .unwrap();

    assert_eq!(result.address(), Some(address_of(&keypair)));
}

#[tokio::test]
async fn test_signature_without_prefix_accepted() {
    let service = make_service();
    register(&service, "ab12cd34", at("2024-01-01T00:00:00Z")).await;

    let result = service
        .verify(
            KAT_MESSAGE,
            &KAT_SIGNATURE[2..],
            &service.expected_claims("ab12cd34"),
            at("2024-01-01T00:00:01Z"),
        )
        .await
        .unwrap();

    assert!(result.is_accepted());
}

#[tokio::test]
async fn test_high_s_signature_accepted_once() {
    let service = make_service();
    let keypair = Secp256k1KeyPair::generate();

    let nonce = service.issue_nonce().await.unwrap();
    let text = login_message(&keypair, &nonce, Utc::now()).to_string();
    let mut signature: SiweSignature = sign(&keypair, &text).parse().unwrap();

    // (r, n - s) with the opposite parity is the same signature in high-S form
    let s = Scalar::from_repr(*FieldBytes::from_slice(&signature.s)).unwrap();
    signature.s.copy_from_slice(&(-s).to_bytes());
    signature.v = if signature.v == 27 { 28 } else { 27 };

    let claims = service.expected_claims(&nonce);
    let first = service
        .verify(&text, &signature.to_hex(), &claims, Utc::now())
        .await
        .unwrap();
    assert_eq!(first.address(), Some(address_of(&keypair)));

    let second = service
        .verify(&text, &signature.to_hex(), &claims, Utc::now())
        .await
        .unwrap();
    assert_eq!(rejection(second), RejectionReason::NonceReplay);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_double_submit_single_acceptance() {
    let service = Arc::new(make_service());
    let keypair = Secp256k1KeyPair::generate();
    let nonce = service.issue_nonce().await.unwrap();
    let text = login_message(&keypair, &nonce, Utc::now()).to_string();
    let signature = sign(&keypair, &text);
    let claims = service.expected_claims(&nonce);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = Arc::clone(&service);
            let text = text.clone();
            let signature = signature.clone();
            let claims = claims.clone();
            tokio::spawn(async move {
                service
                    .verify(&text, &signature, &claims, Utc::now())
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            VerificationResult::Accepted { .. } => accepted += 1,
            VerificationResult::Rejected { reason } => {
                assert_eq!(reason, RejectionReason::NonceReplay)
            }
        }
    }
    assert_eq!(accepted, 1);
}

// =============================================================================
// BINDING
// =============================================================================

#[tokio::test]
async fn test_foreign_domain_rejected() {
    let service = make_service();
    let keypair = Secp256k1KeyPair::generate();
    let nonce = service.issue_nonce().await.unwrap();

    let text = Message::builder(
        "evil.example",
        address_of(&keypair),
        "https://evil.example/login",
        1,
        nonce.as_str(),
        Utc::now(),
    )
    .build()
    .unwrap()
    .to_string();
    let signature = sign(&keypair, &text);

    let reason = rejection(
        service
            .verify(&text, &signature, &service.expected_claims(&nonce), Utc::now())
            .await
            .unwrap(),
    );
    assert_eq!(
        reason,
        RejectionReason::DomainMismatch {
            expected: "example.com".into(),
            actual: "evil.example".into(),
        }
    );

    // Nonce is still usable after a rejection
    let entry = service.store().lookup(&nonce).await.unwrap().unwrap();
    assert!(!entry.consumed);
}

#[tokio::test]
async fn test_session_nonce_mismatch() {
    let service = make_service();
    let keypair = Secp256k1KeyPair::generate();
    let nonce = service.issue_nonce().await.unwrap();
    let other = service.issue_nonce().await.unwrap();

    let text = login_message(&keypair, &nonce, Utc::now()).to_string();
    let signature = sign(&keypair, &text);

    for session_nonce in [other.as_str(), ""] {
        let reason = rejection(
            service
                .verify(
                    &text,
                    &signature,
                    &service.expected_claims(session_nonce),
                    Utc::now(),
                )
                .await
                .unwrap(),
        );
        assert_eq!(reason, RejectionReason::NonceMismatch);
    }
}

#[tokio::test]
async fn test_unknown_nonce_rejected() {
    let service = make_service();
    let keypair = Secp256k1KeyPair::generate();

    let text = login_message(&keypair, "neverIssued1", Utc::now()).to_string();
    let signature = sign(&keypair, &text);

    let reason = rejection(
        service
            .verify(
                &text,
                &signature,
                &service.expected_claims("neverIssued1"),
                Utc::now(),
            )
            .await
            .unwrap(),
    );
    assert_eq!(reason, RejectionReason::UnknownNonce);
}

#[tokio::test]
async fn test_chain_mismatch_rejected() {
    let service = make_service();
    let keypair = Secp256k1KeyPair::generate();
    let nonce = service.issue_nonce().await.unwrap();

    let text = Message::builder(
        "example.com",
        address_of(&keypair),
        "https://example.com/login",
        137,
        nonce.as_str(),
        Utc::now(),
    )
    .build()
    .unwrap()
    .to_string();
    let signature = sign(&keypair, &text);

    let reason = rejection(
        service
            .verify(&text, &signature, &service.expected_claims(&nonce), Utc::now())
            .await
            .unwrap(),
    );
    assert_eq!(reason, RejectionReason::ChainMismatch { chain_id: 137 });
}

#[tokio::test]
async fn test_signed_by_someone_else_rejected() {
    let service = make_service();
    let claimed = Secp256k1KeyPair::generate();
    let actual = Secp256k1KeyPair::generate();
    let nonce = service.issue_nonce().await.unwrap();

    let text = login_message(&claimed, &nonce, Utc::now()).to_string();
    let signature = sign(&actual, &text);

    let reason = rejection(
        service
            .verify(&text, &signature, &service.expected_claims(&nonce), Utc::now())
            .await
            .unwrap(),
    );
    assert_eq!(
        reason,
        RejectionReason::AddressMismatch {
            claimed: address_of(&claimed),
            recovered: address_of(&actual),
        }
    );
}

// =============================================================================
// TIME WINDOW
// =============================================================================

#[tokio::test]
async fn test_expiry_boundary() {
    let keypair = Secp256k1KeyPair::generate();
    let issued = at("2024-06-01T12:00:00Z");
    let expiry = issued + Duration::minutes(5);

    let text = Message::builder(
        "example.com",
        address_of(&keypair),
        "https://example.com/login",
        1,
        "expiry0001",
        issued,
    )
    .expiration_time(expiry)
    .build()
    .unwrap()
    .to_string();
    let signature = sign(&keypair, &text);

    // one second after expiry
    let service = make_service();
    register(&service, "expiry0001", issued).await;
    let reason = rejection(
        service
            .verify(
                &text,
                &signature,
                &service.expected_claims("expiry0001"),
                expiry + Duration::seconds(1),
            )
            .await
            .unwrap(),
    );
    assert_eq!(
        reason,
        RejectionReason::Expired {
            expiration_time: expiry
        }
    );

    // one second before expiry
    let service = make_service();
    register(&service, "expiry0001", issued).await;
    let result = service
        .verify(
            &text,
            &signature,
            &service.expected_claims("expiry0001"),
            expiry - Duration::seconds(1),
        )
        .await
        .unwrap();
    assert!(result.is_accepted());
}

#[tokio::test]
async fn test_not_before_boundary() {
    let keypair = Secp256k1KeyPair::generate();
    let issued = at("2024-06-01T12:00:00Z");
    let not_before = issued + Duration::minutes(1);

    let text = Message::builder(
        "example.com",
        address_of(&keypair),
        "https://example.com/login",
        1,
        "notbefore1",
        issued,
    )
    .not_before(not_before)
    .build()
    .unwrap()
    .to_string();
    let signature = sign(&keypair, &text);

    let service = make_service();
    register(&service, "notbefore1", issued).await;
    let claims = service.expected_claims("notbefore1");

    let early = service
        .verify(&text, &signature, &claims, not_before - Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(rejection(early), RejectionReason::NotYetValid { not_before });

    let on_time = service
        .verify(&text, &signature, &claims, not_before)
        .await
        .unwrap();
    assert!(on_time.is_accepted());
}

// =============================================================================
// TAMPERING
// =============================================================================

#[tokio::test]
async fn test_text_byte_flips_rejected() {
    let service = make_service();
    register(&service, "ab12cd34", at("2024-01-01T00:00:00Z")).await;
    let claims = service.expected_claims("ab12cd34");
    let now = at("2024-01-01T00:00:01Z");

    let tampered = [
        KAT_MESSAGE.replace("example dapp", "example dapq"),
        KAT_MESSAGE.replace("https://example.com/login", "https://example.com/logim"),
        KAT_MESSAGE.replace("Issued At: 2024-01-01T00:00:00Z", "Issued At: 2024-01-01T00:00:01Z"),
    ];
    for text in &tampered {
        let result = service
            .verify(text, KAT_SIGNATURE, &claims, now)
            .await
            .unwrap();
        assert!(!result.is_accepted(), "tampered text accepted: {text}");
    }

    // The untouched message still works afterwards
    let result = service
        .verify(KAT_MESSAGE, KAT_SIGNATURE, &claims, now)
        .await
        .unwrap();
    assert!(result.is_accepted());
}

#[tokio::test]
async fn test_signature_byte_flips_rejected() {
    let service = make_service();
    register(&service, "ab12cd34", at("2024-01-01T00:00:00Z")).await;
    let claims = service.expected_claims("ab12cd34");
    let now = at("2024-01-01T00:00:01Z");

    // flip one hex digit in r, in s and in v
    for position in [2usize, 70, 130] {
        let mut digits: Vec<char> = KAT_SIGNATURE.chars().collect();
        digits[position] = if digits[position] == '0' { '1' } else { '0' };
        let tampered: String = digits.into_iter().collect();

        let result = service
            .verify(KAT_MESSAGE, &tampered, &claims, now)
            .await
            .unwrap();
        assert!(
            !result.is_accepted(),
            "tampered signature accepted at {position}"
        );
    }
}

#[tokio::test]
async fn test_malformed_signature_rejected() {
    let service = make_service();
    register(&service, "ab12cd34", at("2024-01-01T00:00:00Z")).await;

    let result = service
        .verify(
            KAT_MESSAGE,
            "0xdeadbeef",
            &service.expected_claims("ab12cd34"),
            at("2024-01-01T00:00:01Z"),
        )
        .await
        .unwrap();

    assert_eq!(rejection(result).kind(), "bad_signature");
}

// =============================================================================
// INFRASTRUCTURE
// =============================================================================

#[tokio::test]
async fn test_unavailable_store_is_an_error() {
    let service = SiweAuthService::new(AuthConfig::new("example.com"), UnavailableStore).unwrap();

    assert_eq!(
        service.issue_nonce().await,
        Err(AuthError::StoreUnavailable("connection refused".into()))
    );

    let result = service
        .verify(
            KAT_MESSAGE,
            KAT_SIGNATURE,
            &service.expected_claims("ab12cd34"),
            at("2024-01-01T00:00:01Z"),
        )
        .await;
    assert_eq!(
        result,
        Err(AuthError::StoreUnavailable("connection refused".into()))
    );
}

#[tokio::test]
async fn test_rejection_before_store_access_is_still_a_verdict() {
    // A malformed message never reaches the store, so even a dead store
    // yields a verdict rather than an error.
    let service = SiweAuthService::new(AuthConfig::new("example.com"), UnavailableStore).unwrap();

    let result = service
        .verify(
            "not a sign-in message",
            KAT_SIGNATURE,
            &service.expected_claims("ab12cd34"),
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(rejection(result).kind(), "malformed");
}
