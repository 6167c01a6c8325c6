//! End-to-end sign-in flows over nullable collaborators.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use zkauth_nullables::{
    credential_statement, NullClock, NullDocumentFetcher, NullKeyLoader, NullProofEngine,
    NullStateResolver, ResponseBuilder,
};
use zkauth_store::{ConflictReason, MemorySessionStore, SessionState, SessionStore};
use zkauth_types::{
    AuthorizationRequest, CircuitId, ErrorKind, FieldQuery, SessionId, VerifiedClaims,
};
use zkauth_verification::backend::{
    EngineError, FetchError, FieldProof, PublicStatement, ResolveError, StateClaim,
};
use zkauth_verification::{
    ChallengeBuilder, HandleError, ProtocolVerifier, ReissuePolicy, ResponseHandler, RetryPolicy,
    SessionStatus, SignInPolicy, StatusQuery, VerificationError, VerifierConfig,
};

const NOW: u64 = 1_700_000_000;
const AUDIENCE: &str = "did:iden3:polygon:amoy:verifier";
const HOLDER: &str = "did:iden3:polygon:amoy:holder";
const ISSUER: &str = "did:iden3:polygon:amoy:issuer";
const MTP: &str = CircuitId::ATOMIC_QUERY_MTP_V2;
const CALLBACK: &str = "https://verifier.example/api/callback";

struct Harness {
    store: Arc<MemorySessionStore>,
    keys: Arc<NullKeyLoader>,
    documents: Arc<NullDocumentFetcher>,
    resolver: Arc<NullStateResolver>,
    engine: Arc<NullProofEngine>,
    builder: ChallengeBuilder,
    handler: ResponseHandler,
    status: StatusQuery,
}

fn config() -> VerifierConfig {
    VerifierConfig {
        retry: RetryPolicy::none(),
        ..Default::default()
    }
}

fn harness() -> Harness {
    harness_with(
        SignInPolicy::social_credential(AUDIENCE, CALLBACK),
        ReissuePolicy::Reject,
        config(),
    )
}

fn harness_with(policy: SignInPolicy, reissue: ReissuePolicy, config: VerifierConfig) -> Harness {
    let store = Arc::new(MemorySessionStore::new());
    let clock = Arc::new(NullClock::new(NOW));
    let keys = Arc::new(NullKeyLoader::with_circuits([CircuitId::AUTH_V2, MTP]));
    let documents = Arc::new(NullDocumentFetcher::new());
    documents.declare(
        SignInPolicy::SOCIAL_CREDENTIAL_CONTEXT,
        &["SocialCredential", "KYCAgeCredential"],
    );
    let resolver = Arc::new(NullStateResolver::new());
    resolver.set_state(HOLDER, "0xh1", NOW - 1_000);
    resolver.set_state(ISSUER, "0xi1", NOW - 1_000);
    let engine = Arc::new(NullProofEngine::new());

    let verifier = ProtocolVerifier::new(
        keys.clone(),
        documents.clone(),
        engine.clone(),
        clock.clone(),
        config,
    )
    .with_resolver("polygon:amoy", "0x1a4cC30f2aA0377b0c3bc9848766D90cb4404124", resolver.clone());

    let builder = ChallengeBuilder::new(store.clone(), policy, reissue, clock.clone()).unwrap();
    let handler = ResponseHandler::new(store.clone(), Arc::new(verifier), clock);
    let status = StatusQuery::new(store.clone());

    Harness {
        store,
        keys,
        documents,
        resolver,
        engine,
        builder,
        handler,
        status,
    }
}

fn sid(s: &str) -> SessionId {
    SessionId::parse(s).unwrap()
}

fn wallet_statement() -> PublicStatement {
    let mut statement = credential_statement(HOLDER, ISSUER, "SocialCredential");
    statement.fields.insert(
        "walletAddress".into(),
        FieldProof::Disclosed {
            value: json!("0x9cF4c2f9b3B1e5a1f0A6e0C1a7a3A9d6b8e1F234"),
        },
    );
    statement.states.push(StateClaim {
        did: ISSUER.into(),
        state: "0xi1".into(),
    });
    statement
}

fn valid_response(challenge: &AuthorizationRequest) -> ResponseBuilder {
    ResponseBuilder::answering(challenge, HOLDER)
        .holder_state(HOLDER, "0xh1")
        .proof(1, MTP, wallet_statement())
}

async fn submit(
    h: &Harness,
    id: &str,
    response: ResponseBuilder,
) -> Result<VerifiedClaims, HandleError> {
    h.handler
        .handle(&sid(id), response.build().unwrap().into_bytes())
        .await
}

fn verification_error(result: Result<VerifiedClaims, HandleError>) -> VerificationError {
    match result {
        Err(HandleError::Verification(e)) => e,
        other => panic!("expected verification error, got {other:?}"),
    }
}

async fn failure_kind(h: &Harness, id: &str) -> ErrorKind {
    match h.status.query(&sid(id)).await.unwrap() {
        SessionStatus::Failed(failure) => failure.kind,
        other => panic!("expected failed status, got {other:?}"),
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn s1_wrong_field_fails_requirement_one() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    assert!(h.status.query(&sid("s1")).await.unwrap().is_pending());

    let mut statement = credential_statement(HOLDER, ISSUER, "SocialCredential");
    statement.fields.insert(
        "email".into(),
        FieldProof::Disclosed {
            value: json!("holder@example.com"),
        },
    );
    let response = ResponseBuilder::answering(&issued.request, HOLDER)
        .holder_state(HOLDER, "0xh1")
        .proof(1, MTP, statement);

    let err = verification_error(submit(&h, "s1", response).await);
    assert!(matches!(err, VerificationError::ProofRequirementUnmet { id: 1, .. }));

    match h.status.query(&sid("s1")).await.unwrap() {
        SessionStatus::Failed(failure) => {
            assert_eq!(failure.kind, ErrorKind::ProofRequirementUnmet);
            assert_eq!(failure.requirement_id, Some(1));
        }
        other => panic!("expected failed status, got {other:?}"),
    }
}

#[tokio::test]
async fn s2_valid_response_is_verified() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s2"))).await.unwrap();

    let claims = submit(&h, "s2", valid_response(&issued.request)).await.unwrap();
    assert_eq!(claims.sender, HOLDER);
    assert_eq!(
        claims.attributes["walletAddress"],
        json!("0x9cF4c2f9b3B1e5a1f0A6e0C1a7a3A9d6b8e1F234")
    );
    assert_eq!(claims.requirements[&1].issuer, ISSUER);

    assert_eq!(
        h.status.query(&sid("s2")).await.unwrap(),
        SessionStatus::Success(claims)
    );
    let session = h.store.get(&sid("s2")).await.unwrap();
    assert_eq!(session.state, SessionState::Verified);
    assert!(session.raw_response.is_some());
    assert_eq!(session.responded_at.map(|t| t.as_secs()), Some(NOW));
}

#[tokio::test]
async fn attributes_are_exactly_the_requested_disclosures() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let mut statement = wallet_statement();
    statement.fields.insert(
        "email".into(),
        FieldProof::Disclosed {
            value: json!("holder@example.com"),
        },
    );
    let response = ResponseBuilder::answering(&issued.request, HOLDER)
        .holder_state(HOLDER, "0xh1")
        .proof(1, MTP, statement);

    let claims = submit(&h, "s1", response).await.unwrap();
    assert_eq!(claims.attributes.keys().collect::<Vec<_>>(), vec!["walletAddress"]);
}

#[tokio::test]
async fn predicate_fields_are_proven_not_disclosed() {
    let mut policy = SignInPolicy::social_credential(AUDIENCE, CALLBACK);
    policy.disclosures[0].credential_type = "KYCAgeCredential".into();
    policy.disclosures[0].subject_fields = [(
        "birthday".to_string(),
        FieldQuery::predicate("$lt", json!(20060101)),
    )]
    .into_iter()
    .collect();
    let h = harness_with(policy, ReissuePolicy::Reject, config());
    let issued = h.builder.issue(Some(sid("age"))).await.unwrap();

    let mut statement = credential_statement(HOLDER, ISSUER, "KYCAgeCredential");
    statement.fields.insert(
        "birthday".into(),
        FieldProof::Predicate {
            operators: [("$lt".to_string(), json!(20060101))].into_iter().collect(),
        },
    );
    let response = ResponseBuilder::answering(&issued.request, HOLDER)
        .holder_state(HOLDER, "0xh1")
        .proof(1, MTP, statement);

    let claims = submit(&h, "age", response).await.unwrap();
    assert!(claims.attributes.is_empty());
    assert_eq!(claims.requirements[&1].proven, vec!["birthday"]);
}

// ── Binding ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn binding_mismatch_is_rejected_regardless_of_proofs() {
    let cases: [(&str, fn(ResponseBuilder) -> ResponseBuilder); 8] = [
        ("thid", |r| r.thid(Some("some-other-challenge"))),
        ("no-thid", |r| r.thid(None)),
        ("audience", |r| r.to(Some("did:iden3:polygon:amoy:someone-else"))),
        ("no-audience", |r| r.to(None)),
        ("no-sender", |r| r.from(None)),
        ("bad-sender", |r| r.from(Some("holder"))),
        ("envelope-subject", |r| {
            r.envelope_subject("did:iden3:polygon:amoy:impostor")
        }),
        ("envelope-invalid", |r| r.invalid_envelope()),
    ];

    for (name, tamper) in cases {
        let h = harness();
        let issued = h.builder.issue(Some(sid(name))).await.unwrap();
        let response = tamper(valid_response(&issued.request));
        let err = verification_error(submit(&h, name, response).await);
        assert!(
            matches!(err, VerificationError::ChallengeMismatch(_)),
            "{name}: {err:?}"
        );
        assert_eq!(failure_kind(&h, name).await, ErrorKind::ChallengeMismatch);
    }
}

#[tokio::test]
async fn response_to_another_challenge_is_rejected() {
    let h = harness();
    let first = h.builder.issue(Some(sid("a"))).await.unwrap();
    h.builder.issue(Some(sid("b"))).await.unwrap();

    let err = verification_error(submit(&h, "b", valid_response(&first.request)).await);
    assert!(matches!(err, VerificationError::ChallengeMismatch(_)));
}

#[tokio::test]
async fn omitted_audience_is_a_mismatch() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    let response = valid_response(&issued.request).to(None);
    let err = verification_error(submit(&h, "s1", response).await);
    assert!(matches!(err, VerificationError::ChallengeMismatch(_)));
    assert!(h.engine.calls().is_empty());
}

#[tokio::test]
async fn misbound_response_with_extra_proof_is_a_mismatch() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let response = valid_response(&issued.request)
        .thid(Some("another-thread"))
        .proof(2, MTP, wallet_statement());

    let err = verification_error(submit(&h, "s1", response).await);
    assert!(matches!(err, VerificationError::ChallengeMismatch(_)), "{err:?}");
    assert_eq!(failure_kind(&h, "s1").await, ErrorKind::ChallengeMismatch);
}

#[tokio::test]
async fn credential_proof_by_another_identity_is_a_mismatch() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let mut statement = wallet_statement();
    statement.subject = Some("did:iden3:polygon:amoy:impostor".into());
    let response = ResponseBuilder::answering(&issued.request, HOLDER)
        .holder_state(HOLDER, "0xh1")
        .proof(1, MTP, statement);

    let err = verification_error(submit(&h, "s1", response).await);
    assert!(matches!(err, VerificationError::ChallengeMismatch(_)));
}

// ── Requirements ─────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_proof_fails_requirement() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let response = ResponseBuilder::answering(&issued.request, HOLDER).holder_state(HOLDER, "0xh1");

    let err = verification_error(submit(&h, "s1", response).await);
    assert!(matches!(err, VerificationError::ProofRequirementUnmet { id: 1, .. }));
}

#[tokio::test]
async fn invalid_proof_fails_requirement() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let response = ResponseBuilder::answering(&issued.request, HOLDER)
        .holder_state(HOLDER, "0xh1")
        .invalid_proof(1, MTP);

    let err = verification_error(submit(&h, "s1", response).await);
    assert!(matches!(err, VerificationError::ProofRequirementUnmet { id: 1, .. }));
}

#[tokio::test]
async fn unrequested_proof_is_malformed() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let response = valid_response(&issued.request).proof(2, MTP, wallet_statement());

    let err = verification_error(submit(&h, "s1", response).await);
    assert!(matches!(err, VerificationError::MalformedResponse(_)));
}

#[tokio::test]
async fn wrong_circuit_issuer_or_type_fails_requirement() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("circuit"))).await.unwrap();
    let response = ResponseBuilder::answering(&issued.request, HOLDER)
        .holder_state(HOLDER, "0xh1")
        .proof(1, CircuitId::ATOMIC_QUERY_SIG_V2, wallet_statement());
    let err = verification_error(submit(&h, "circuit", response).await);
    assert!(matches!(err, VerificationError::ProofRequirementUnmet { id: 1, .. }));

    let mut policy = SignInPolicy::social_credential(AUDIENCE, CALLBACK);
    policy.disclosures[0].allowed_issuers = vec!["did:iden3:polygon:amoy:trusted".into()];
    let h = harness_with(policy, ReissuePolicy::Reject, config());
    let issued = h.builder.issue(Some(sid("issuer"))).await.unwrap();
    let err = verification_error(submit(&h, "issuer", valid_response(&issued.request)).await);
    assert!(matches!(err, VerificationError::ProofRequirementUnmet { id: 1, .. }));

    let h = harness();
    let issued = h.builder.issue(Some(sid("type"))).await.unwrap();
    let mut statement = wallet_statement();
    statement.credential_type = Some("KYCAgeCredential".into());
    let response = ResponseBuilder::answering(&issued.request, HOLDER)
        .holder_state(HOLDER, "0xh1")
        .proof(1, MTP, statement);
    let err = verification_error(submit(&h, "type", response).await);
    assert!(matches!(err, VerificationError::ProofRequirementUnmet { id: 1, .. }));
}

#[tokio::test]
async fn missing_key_is_reported() {
    let h = harness();
    h.keys.remove(&CircuitId::new(MTP));
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    let err = verification_error(submit(&h, "s1", valid_response(&issued.request)).await);
    assert!(matches!(err, VerificationError::KeyNotFound { .. }));
    assert_eq!(failure_kind(&h, "s1").await, ErrorKind::KeyNotFound);
}

#[tokio::test]
async fn unavailable_schema_is_reported() {
    let h = harness();
    h.documents
        .fail_next(FetchError::NotFound(SignInPolicy::SOCIAL_CREDENTIAL_CONTEXT.into()));
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    let err = verification_error(submit(&h, "s1", valid_response(&issued.request)).await);
    assert!(matches!(err, VerificationError::SchemaUnavailable { id: 1, .. }));
}

#[tokio::test]
async fn malformed_body_fails_the_session() {
    let h = harness();
    h.builder.issue(Some(sid("s1"))).await.unwrap();

    let result = h.handler.handle(&sid("s1"), b"{\"not\": \"a token\"}".to_vec()).await;
    assert!(matches!(
        verification_error(result),
        VerificationError::MalformedResponse(_)
    ));
    assert_eq!(failure_kind(&h, "s1").await, ErrorKind::MalformedResponse);
}

#[tokio::test]
async fn wrong_message_type_is_malformed() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let response = valid_response(&issued.request)
        .message_type("https://iden3-communication.io/authorization/1.0/request");

    let err = verification_error(submit(&h, "s1", response).await);
    assert!(matches!(err, VerificationError::MalformedResponse(_)));
}

// ── Identity state ───────────────────────────────────────────────────────

#[tokio::test]
async fn replaced_state_at_window_edge_is_accepted() {
    let h = harness();
    h.resolver.set_state(HOLDER, "0xh2", NOW - 300);
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    assert!(submit(&h, "s1", valid_response(&issued.request)).await.is_ok());
}

#[tokio::test]
async fn replaced_state_past_window_is_stale() {
    let h = harness();
    h.resolver.set_state(HOLDER, "0xh2", NOW - 301);
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    let err = verification_error(submit(&h, "s1", valid_response(&issued.request)).await);
    match err {
        VerificationError::StaleState {
            did,
            age_secs,
            window_secs,
        } => {
            assert_eq!(did, HOLDER);
            assert_eq!(age_secs, 301);
            assert_eq!(window_secs, 300);
        }
        other => panic!("expected stale state, got {other:?}"),
    }
    assert_eq!(failure_kind(&h, "s1").await, ErrorKind::StaleState);
}

#[tokio::test]
async fn state_never_published_is_unresolvable() {
    let h = harness();
    h.resolver.set_state(HOLDER, "0xh2", NOW - 10);
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let response = ResponseBuilder::answering(&issued.request, HOLDER)
        .holder_state(HOLDER, "0xnever-on-chain")
        .proof(1, MTP, wallet_statement());

    let err = verification_error(submit(&h, "s1", response).await);
    assert!(
        matches!(err, VerificationError::UnresolvableState { ref did, .. } if did == HOLDER),
        "{err:?}"
    );
    assert_eq!(failure_kind(&h, "s1").await, ErrorKind::UnresolvableState);
}

#[tokio::test]
async fn old_state_ages_from_its_replacement() {
    let h = harness();
    // 0xh1 was published long ago but only replaced 100 s ago.
    h.resolver.set_state(HOLDER, "0xh2", NOW - 100);
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    assert!(submit(&h, "s1", valid_response(&issued.request)).await.is_ok());
}

#[tokio::test]
async fn stale_issuer_state_is_rejected_too() {
    let h = harness();
    h.resolver.set_state(ISSUER, "0xi2", NOW - 3_600);
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    let err = verification_error(submit(&h, "s1", valid_response(&issued.request)).await);
    assert!(matches!(err, VerificationError::StaleState { did, .. } if did == ISSUER));
}

#[tokio::test]
async fn each_state_is_resolved_once() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let response = valid_response(&issued.request).holder_state(HOLDER, "0xh1");

    submit(&h, "s1", response).await.unwrap();
    let lookups = h.resolver.lookups();
    assert_eq!(lookups.len(), 2);
    assert!(lookups.iter().all(|(network, _)| network == "polygon:amoy"));
}

#[tokio::test]
async fn unknown_network_is_unresolvable() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let response = valid_response(&issued.request).holder_state("did:iden3:eth:main:holder", "0x1");

    let err = verification_error(submit(&h, "s1", response).await);
    assert!(matches!(err, VerificationError::UnresolvableState { .. }));
    assert_eq!(failure_kind(&h, "s1").await, ErrorKind::UnresolvableState);
}

#[tokio::test(start_paused = true)]
async fn transient_resolver_faults_are_retried() {
    let h = harness_with(
        SignInPolicy::social_credential(AUDIENCE, CALLBACK),
        ReissuePolicy::Reject,
        VerifierConfig::default(),
    );
    h.resolver.fail_next(ResolveError::Transport("connection reset".into()));
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    assert!(submit(&h, "s1", valid_response(&issued.request)).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn persistent_resolver_faults_are_unresolvable() {
    let h = harness_with(
        SignInPolicy::social_credential(AUDIENCE, CALLBACK),
        ReissuePolicy::Reject,
        VerifierConfig::default(),
    );
    for _ in 0..3 {
        h.resolver.fail_next(ResolveError::Transport("connection reset".into()));
    }
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    let err = verification_error(submit(&h, "s1", valid_response(&issued.request)).await);
    assert!(matches!(err, VerificationError::UnresolvableState { .. }));
}

// ── Lifecycle ────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_session_is_rejected() {
    let h = harness();
    let result = h.handler.handle(&sid("ghost"), b"x.y.z".to_vec()).await;
    assert!(matches!(result, Err(HandleError::UnknownSession(_))));
}

#[tokio::test]
async fn terminal_outcome_is_never_overwritten() {
    let h = harness();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let claims = submit(&h, "s1", valid_response(&issued.request)).await.unwrap();

    let second = h.handler.handle(&sid("s1"), b"garbage".to_vec()).await;
    assert!(matches!(
        second,
        Err(HandleError::Conflict {
            reason: ConflictReason::AlreadyTerminal,
            ..
        })
    ));
    assert_eq!(
        h.status.query(&sid("s1")).await.unwrap(),
        SessionStatus::Success(claims)
    );
}

#[tokio::test(start_paused = true)]
async fn concurrent_responses_admit_exactly_one() {
    let h = harness();
    h.engine.stall(Duration::from_millis(500));
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let response = valid_response(&issued.request);

    let (a, b) = tokio::join!(submit(&h, "s1", response.clone()), submit(&h, "s1", response));
    let conflicts = [&a, &b]
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(HandleError::Conflict {
                    reason: ConflictReason::InFlight,
                    ..
                })
            )
        })
        .count();
    assert_eq!(conflicts, 1);
    assert!(a.is_ok() || b.is_ok());
}

#[tokio::test(start_paused = true)]
async fn slow_verification_times_out() {
    let h = harness_with(
        SignInPolicy::social_credential(AUDIENCE, CALLBACK),
        ReissuePolicy::Reject,
        VerifierConfig {
            verify_timeout_ms: 1_000,
            retry: RetryPolicy::none(),
            ..Default::default()
        },
    );
    h.engine.stall(Duration::from_secs(60));
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    let err = verification_error(submit(&h, "s1", valid_response(&issued.request)).await);
    assert!(matches!(err, VerificationError::Timeout(_)));
    assert_eq!(failure_kind(&h, "s1").await, ErrorKind::Timeout);
}

#[tokio::test]
async fn panicking_engine_fails_the_session() {
    let h = harness();
    h.engine.panic_next();
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    let err = verification_error(submit(&h, "s1", valid_response(&issued.request)).await);
    assert!(matches!(err, VerificationError::Internal(_)));
    assert_eq!(failure_kind(&h, "s1").await, ErrorKind::Internal);
}

#[tokio::test]
async fn engine_transport_fault_is_internal() {
    let h = harness();
    h.engine.fail_next(EngineError::Transport("503".into()));
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();

    let err = verification_error(submit(&h, "s1", valid_response(&issued.request)).await);
    assert!(matches!(err, VerificationError::Internal(_)));
}

#[tokio::test(start_paused = true)]
async fn dropped_caller_still_records_outcome() {
    let h = harness();
    h.engine.stall(Duration::from_secs(1));
    let issued = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let raw = valid_response(&issued.request).build().unwrap().into_bytes();

    let handler = h.handler.clone();
    let call = tokio::spawn(async move { handler.handle(&sid("s1"), raw).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    call.abort();
    assert!(h.status.query(&sid("s1")).await.unwrap().is_pending());

    tokio::time::sleep(Duration::from_secs(5)).await;
    let session = h.store.get(&sid("s1")).await.unwrap();
    assert_eq!(session.state, SessionState::Verified);
}

#[tokio::test(start_paused = true)]
async fn superseded_challenge_discards_stale_outcome() {
    let h = harness_with(
        SignInPolicy::social_credential(AUDIENCE, CALLBACK),
        ReissuePolicy::Supersede,
        config(),
    );
    h.engine.stall(Duration::from_secs(1));
    let first = h.builder.issue(Some(sid("s1"))).await.unwrap();
    let raw = valid_response(&first.request).build().unwrap().into_bytes();

    let handler = h.handler.clone();
    let in_flight = tokio::spawn(async move { handler.handle(&sid("s1"), raw).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = h.builder.issue(Some(sid("s1"))).await.unwrap();
    assert!(second.generation > first.generation);

    let result = in_flight.await.unwrap();
    assert!(matches!(
        result,
        Err(HandleError::Conflict {
            reason: ConflictReason::Superseded,
            ..
        })
    ));
    assert!(h.status.query(&sid("s1")).await.unwrap().is_pending());
}
