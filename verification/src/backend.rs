//! Ports to the external collaborators the verifier delegates to.
//!
//! Concrete implementations live in `zkauth-clients` (filesystem, HTTP) and
//! `zkauth-nullables` (deterministic fakes).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use zkauth_types::{CircuitId, Did, ProofRequest, Timestamp, ZkProof};

use crate::retry::Transient;

// ── Verification keys ────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum KeyLoadError {
    #[error("no verification key for circuit {0}")]
    NotFound(CircuitId),

    #[error("key storage unavailable: {0}")]
    Unavailable(String),
}

impl Transient for KeyLoadError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Maps a circuit id to its verification key material.
#[async_trait]
pub trait KeyLoader: Send + Sync {
    async fn load(&self, circuit: &CircuitId) -> Result<Vec<u8>, KeyLoadError>;
}

// ── Identity state ───────────────────────────────────────────────────────

/// On-chain record of one state of an identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedState {
    pub state: String,
    pub published_at: Timestamp,
    /// When a newer state superseded this one. `None` while it is the latest.
    #[serde(default)]
    pub replaced_at: Option<Timestamp>,
}

impl ResolvedState {
    pub fn is_latest(&self) -> bool {
        self.replaced_at.is_none()
    }
}

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("identity {0} is not resolvable")]
    Unresolvable(String),

    #[error("state {state} was never published for {did}")]
    UnknownState { did: String, state: String },

    #[error("resolver transport error: {0}")]
    Transport(String),
}

impl Transient for ResolveError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Answers "when was `state` of `did` published, and is it still current".
#[async_trait]
pub trait StateResolver: Send + Sync {
    async fn resolve(
        &self,
        network: &str,
        contract_address: &str,
        did: &Did,
        state: &str,
    ) -> Result<ResolvedState, ResolveError>;
}

// ── Schema documents ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document is not valid JSON-LD: {0}")]
    Invalid(String),

    #[error("fetch transport error: {0}")]
    Transport(String),
}

impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Retrieves JSON-LD context documents referenced by credential queries.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Value, FetchError>;
}

/// Whether a JSON-LD context document declares `term`.
///
/// `@context` may be a single object or an array mixing objects and
/// remote references; only inline objects are searched.
pub fn context_declares(document: &Value, term: &str) -> bool {
    fn object_declares(ctx: &Value, term: &str) -> bool {
        ctx.as_object().is_some_and(|o| o.contains_key(term))
    }
    match document.get("@context") {
        Some(Value::Array(items)) => items.iter().any(|c| object_declares(c, term)),
        Some(ctx) => object_declares(ctx, term),
        None => false,
    }
}

// ── Proof engine ─────────────────────────────────────────────────────────

/// What a proof is being verified for.
#[derive(Clone, Copy, Debug)]
pub enum ProofContext<'a> {
    /// The JWZ envelope proof. The engine must confirm the proof commits to
    /// `signing_input` (the `header.payload` part of the token).
    Envelope { signing_input: &'a [u8] },
    /// A credential query proof answering `request`, claimed by `sender`.
    Query {
        request: &'a ProofRequest,
        schema: &'a Value,
        sender: &'a Did,
    },
}

/// How one credential subject field was established by a proof.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldProof {
    /// Value revealed by selective disclosure.
    Disclosed { value: Value },
    /// Value proven to satisfy `operators` without being revealed.
    Predicate { operators: BTreeMap<String, Value> },
}

/// An identity state a proof was generated against.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateClaim {
    pub did: String,
    pub state: String,
}

/// The public statement a valid proof establishes, decoded from its public
/// signals by the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicStatement {
    /// Identity the proof was generated by.
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default, rename = "credentialType")]
    pub credential_type: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldProof>,
    #[serde(default)]
    pub states: Vec<StateClaim>,
}

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("proof is invalid: {0}")]
    InvalidProof(String),

    #[error("circuit {0} is not supported by the proof engine")]
    Unsupported(CircuitId),

    #[error("proof engine transport error: {0}")]
    Transport(String),
}

impl Transient for EngineError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Zero-knowledge proof verification.
#[async_trait]
pub trait ProofEngine: Send + Sync {
    async fn verify(
        &self,
        circuit: &CircuitId,
        key: &[u8],
        proof: &ZkProof,
        context: ProofContext<'_>,
    ) -> Result<PublicStatement, EngineError>;
}
