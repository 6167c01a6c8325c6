//! The verification engine adapter.
//!
//! [`ProtocolVerifier`] owns the protocol rules (token shape, challenge
//! binding, requirement matching, state freshness) and delegates the
//! cryptography and trust anchors to the ports in [`crate::backend`].

use crate::backend::{
    context_declares, DocumentFetcher, EngineError, FieldProof, KeyLoadError, KeyLoader,
    ProofContext, ProofEngine, PublicStatement, StateClaim, StateResolver,
};
use crate::error::VerificationError;
use crate::freshness::{self, Freshness, DEFAULT_STATE_TRANSITION_DELAY_SECS};
use crate::retry::RetryPolicy;
use crate::token::JwzToken;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use zkauth_types::message::AUTH_RESPONSE_TYPE;
use zkauth_types::{
    AuthorizationRequest, CircuitId, Clock, Did, FieldQuery, ProofRequest, ProofResponse,
    RequirementClaims, VerifiedClaims, ZkProof,
};

/// Verifies a raw holder response against the challenge it answers.
#[async_trait]
pub trait ProofVerifier: Send + Sync {
    async fn verify(
        &self,
        raw: &[u8],
        expected: &AuthorizationRequest,
    ) -> Result<VerifiedClaims, VerificationError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// How long a replaced identity state stays acceptable.
    #[serde(default = "default_state_transition_delay_secs")]
    pub state_transition_delay_secs: u64,
    /// Upper bound for one whole `verify` call.
    #[serde(default = "default_verify_timeout_ms")]
    pub verify_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_state_transition_delay_secs() -> u64 {
    DEFAULT_STATE_TRANSITION_DELAY_SECS
}

fn default_verify_timeout_ms() -> u64 {
    30_000
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            state_transition_delay_secs: default_state_transition_delay_secs(),
            verify_timeout_ms: default_verify_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

impl VerifierConfig {
    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }
}

struct NetworkResolver {
    contract_address: String,
    resolver: Arc<dyn StateResolver>,
}

pub struct ProtocolVerifier {
    keys: Arc<dyn KeyLoader>,
    documents: Arc<dyn DocumentFetcher>,
    engine: Arc<dyn ProofEngine>,
    resolvers: HashMap<String, NetworkResolver>,
    clock: Arc<dyn Clock>,
    config: VerifierConfig,
}

impl ProtocolVerifier {
    pub fn new(
        keys: Arc<dyn KeyLoader>,
        documents: Arc<dyn DocumentFetcher>,
        engine: Arc<dyn ProofEngine>,
        clock: Arc<dyn Clock>,
        config: VerifierConfig,
    ) -> Self {
        Self {
            keys,
            documents,
            engine,
            resolvers: HashMap::new(),
            clock,
            config,
        }
    }

    /// Register the resolver for DIDs on `network` (e.g. `polygon:amoy`).
    pub fn with_resolver(
        mut self,
        network: impl Into<String>,
        contract_address: impl Into<String>,
        resolver: Arc<dyn StateResolver>,
    ) -> Self {
        self.resolvers.insert(
            network.into(),
            NetworkResolver {
                contract_address: contract_address.into(),
                resolver,
            },
        );
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    async fn verify_response(
        &self,
        raw: &[u8],
        expected: &AuthorizationRequest,
    ) -> Result<VerifiedClaims, VerificationError> {
        let token =
            JwzToken::parse(raw).map_err(|e| VerificationError::MalformedResponse(e.to_string()))?;
        let message = &token.message;
        if message.message_type != AUTH_RESPONSE_TYPE {
            return Err(VerificationError::MalformedResponse(format!(
                "unexpected message type {:?}",
                message.message_type
            )));
        }

        // Binding, checked before the scope is looked at.
        if message.thid.as_deref() != Some(expected.thid.as_str()) {
            return Err(VerificationError::ChallengeMismatch(format!(
                "thread id {:?} does not match challenge",
                message.thid
            )));
        }
        match message.to.as_deref() {
            Some(to) if to == expected.audience() => {}
            Some(to) => {
                return Err(VerificationError::ChallengeMismatch(format!(
                    "response addressed to {to}"
                )))
            }
            None => {
                return Err(VerificationError::ChallengeMismatch(
                    "response names no recipient".into(),
                ))
            }
        }
        let sender = message
            .from
            .as_deref()
            .ok_or_else(|| VerificationError::ChallengeMismatch("response has no sender".into()))
            .and_then(|from| {
                Did::parse(from).map_err(|e| VerificationError::ChallengeMismatch(e.to_string()))
            })?;
        let responses = index_responses(&message.body.scope, expected)?;

        let mut states: BTreeSet<StateClaim> = BTreeSet::new();

        // Envelope proof: the sender really produced this token.
        let envelope = self.verify_envelope(&token, &sender).await?;
        states.extend(envelope.states);

        let mut claims = VerifiedClaims {
            sender: sender.to_string(),
            ..Default::default()
        };
        for request in expected.requirements() {
            let response = responses.get(&request.id).copied().ok_or_else(|| {
                VerificationError::unmet(request.id, "no proof for this requirement")
            })?;
            let (requirement, statement_states) =
                self.verify_requirement(request, response, &sender).await?;
            for field in request.query.disclosed_fields() {
                if let Some(value) = requirement.disclosed.get(field) {
                    claims.attributes.insert(field.to_string(), value.clone());
                }
            }
            claims.requirements.insert(request.id, requirement);
            states.extend(statement_states);
        }

        for claim in &states {
            self.check_state(claim).await?;
        }

        Ok(claims)
    }

    async fn verify_envelope(
        &self,
        token: &JwzToken,
        sender: &Did,
    ) -> Result<PublicStatement, VerificationError> {
        let circuit = &token.header.circuit_id;
        let key = self.load_key(circuit).await?;
        let statement = self
            .run_engine(
                circuit,
                &key,
                &token.proof,
                ProofContext::Envelope {
                    signing_input: token.signing_input(),
                },
            )
            .await
            .map_err(|e| match e {
                EngineError::InvalidProof(reason) => VerificationError::ChallengeMismatch(
                    format!("envelope proof invalid: {reason}"),
                ),
                other => engine_fault(other),
            })?;
        if statement.subject.as_deref() != Some(sender.as_str()) {
            return Err(VerificationError::ChallengeMismatch(format!(
                "envelope proven by {:?}, not by sender {sender}",
                statement.subject
            )));
        }
        tracing::debug!(circuit = %circuit, sender = %sender, "envelope proof verified");
        Ok(statement)
    }

    async fn verify_requirement(
        &self,
        request: &ProofRequest,
        response: &ProofResponse,
        sender: &Did,
    ) -> Result<(RequirementClaims, Vec<StateClaim>), VerificationError> {
        let id = request.id;
        let query = &request.query;
        if response.circuit_id != request.circuit_id {
            return Err(VerificationError::unmet(
                id,
                format!(
                    "proof uses circuit {}, requirement asks for {}",
                    response.circuit_id, request.circuit_id
                ),
            ));
        }

        let schema = self
            .config
            .retry
            .run("fetch schema context", || self.documents.fetch(&query.context))
            .await
            .map_err(|e| VerificationError::SchemaUnavailable {
                id,
                reason: format!("{}: {e}", query.context),
            })?;
        if !context_declares(&schema, &query.credential_type) {
            return Err(VerificationError::SchemaUnavailable {
                id,
                reason: format!(
                    "{} does not declare {}",
                    query.context, query.credential_type
                ),
            });
        }

        let key = self.load_key(&request.circuit_id).await?;
        let statement = self
            .run_engine(
                &request.circuit_id,
                &key,
                &response.proof,
                ProofContext::Query {
                    request,
                    schema: &schema,
                    sender,
                },
            )
            .await
            .map_err(|e| match e {
                EngineError::InvalidProof(reason) => VerificationError::unmet(id, reason),
                other => engine_fault(other),
            })?;

        if statement.subject.as_deref() != Some(sender.as_str()) {
            return Err(VerificationError::ChallengeMismatch(format!(
                "proof for requirement {id} was generated by {:?}",
                statement.subject
            )));
        }
        let issuer = statement
            .issuer
            .clone()
            .ok_or_else(|| VerificationError::unmet(id, "proof names no issuer"))?;
        if !query.allows_issuer(&issuer) {
            return Err(VerificationError::unmet(
                id,
                format!("issuer {issuer} is not allowed"),
            ));
        }
        if statement.credential_type.as_deref() != Some(query.credential_type.as_str()) {
            return Err(VerificationError::unmet(
                id,
                format!(
                    "credential type {:?}, expected {}",
                    statement.credential_type, query.credential_type
                ),
            ));
        }

        let mut disclosed = BTreeMap::new();
        let mut proven = Vec::new();
        for (field, field_query) in &query.credential_subject {
            match check_field(field_query, statement.fields.get(field)) {
                Some(FieldOutcome::Disclosed(value)) => {
                    disclosed.insert(field.clone(), value);
                }
                Some(FieldOutcome::Proven) => proven.push(field.clone()),
                None => {
                    return Err(VerificationError::unmet(
                        id,
                        format!("field {field} is not established as requested"),
                    ))
                }
            }
        }

        tracing::debug!(requirement = id, circuit = %request.circuit_id, "requirement satisfied");
        Ok((
            RequirementClaims {
                circuit_id: request.circuit_id.to_string(),
                credential_type: query.credential_type.clone(),
                issuer,
                disclosed,
                proven,
            },
            statement.states,
        ))
    }

    async fn check_state(&self, claim: &StateClaim) -> Result<(), VerificationError> {
        let unresolvable = |reason: String| VerificationError::UnresolvableState {
            did: claim.did.clone(),
            reason,
        };
        let did = Did::parse(&claim.did).map_err(|e| unresolvable(e.to_string()))?;
        let network = did
            .network()
            .ok_or_else(|| unresolvable("DID names no network".into()))?;
        let entry = self
            .resolvers
            .get(&network)
            .ok_or_else(|| unresolvable(format!("no resolver for network {network}")))?;

        let resolved = self
            .config
            .retry
            .run("resolve identity state", || {
                entry
                    .resolver
                    .resolve(&network, &entry.contract_address, &did, &claim.state)
            })
            .await
            .map_err(|e| unresolvable(e.to_string()))?;
        if resolved.state != claim.state {
            return Err(unresolvable(format!(
                "resolver answered for state {} instead of {}",
                resolved.state, claim.state
            )));
        }

        let window = self.config.state_transition_delay_secs;
        match freshness::assess(&resolved, self.clock.now(), window) {
            Freshness::Stale { age_secs } => Err(VerificationError::StaleState {
                did: claim.did.clone(),
                age_secs,
                window_secs: window,
            }),
            fresh => {
                tracing::debug!(did = %claim.did, freshness = ?fresh, "identity state accepted");
                Ok(())
            }
        }
    }

    async fn load_key(&self, circuit: &CircuitId) -> Result<Vec<u8>, VerificationError> {
        self.config
            .retry
            .run("load verification key", || self.keys.load(circuit))
            .await
            .map_err(|e| VerificationError::KeyNotFound {
                circuit: circuit.clone(),
                reason: match e {
                    KeyLoadError::NotFound(_) => "not found".into(),
                    KeyLoadError::Unavailable(reason) => reason,
                },
            })
    }

    async fn run_engine(
        &self,
        circuit: &CircuitId,
        key: &[u8],
        proof: &ZkProof,
        context: ProofContext<'_>,
    ) -> Result<PublicStatement, EngineError> {
        self.config
            .retry
            .run("verify proof", || self.engine.verify(circuit, key, proof, context))
            .await
    }
}

#[async_trait]
impl ProofVerifier for ProtocolVerifier {
    async fn verify(
        &self,
        raw: &[u8],
        expected: &AuthorizationRequest,
    ) -> Result<VerifiedClaims, VerificationError> {
        let limit = self.config.verify_timeout();
        match tokio::time::timeout(limit, self.verify_response(raw, expected)).await {
            Ok(result) => result,
            Err(_) => Err(VerificationError::Timeout(limit)),
        }
    }
}

fn engine_fault(e: EngineError) -> VerificationError {
    VerificationError::Internal(e.to_string())
}

/// Map response proofs by requirement id. Every proof must answer exactly
/// one requirement of the challenge.
fn index_responses<'a>(
    scope: &'a [ProofResponse],
    expected: &AuthorizationRequest,
) -> Result<HashMap<u32, &'a ProofResponse>, VerificationError> {
    let mut index = HashMap::with_capacity(scope.len());
    for response in scope {
        if expected.requirement(response.id).is_none() {
            return Err(VerificationError::MalformedResponse(format!(
                "proof {} answers no requirement of the challenge",
                response.id
            )));
        }
        if index.insert(response.id, response).is_some() {
            return Err(VerificationError::MalformedResponse(format!(
                "duplicate proof for requirement {}",
                response.id
            )));
        }
    }
    Ok(index)
}

#[derive(Debug, PartialEq)]
enum FieldOutcome {
    Disclosed(Value),
    Proven,
}

fn check_field(query: &FieldQuery, proof: Option<&FieldProof>) -> Option<FieldOutcome> {
    match proof? {
        FieldProof::Disclosed { value } if query.is_disclosure() => {
            Some(FieldOutcome::Disclosed(value.clone()))
        }
        FieldProof::Predicate { operators } if !query.is_disclosure() && *operators == query.0 => {
            Some(FieldOutcome::Proven)
        }
        _ => None,
    }
}
