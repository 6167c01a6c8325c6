//! Nullable proof engine.
//!
//! Null proofs are plain JSON: `{"valid": bool, "statement": PublicStatement}`.
//! The engine believes whatever statement a valid null proof carries, so a
//! test decides exactly what each proof establishes.

use crate::lock;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use zkauth_types::{CircuitId, ZkProof};
use zkauth_verification::backend::{EngineError, ProofContext, ProofEngine, PublicStatement};

/// Which kind of proof a call verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofKind {
    Envelope,
    Query(u32),
}

#[derive(Default)]
pub struct NullProofEngine {
    stall: Mutex<Option<Duration>>,
    failures: Mutex<VecDeque<EngineError>>,
    panic_next: AtomicBool,
    calls: Mutex<Vec<(CircuitId, ProofKind)>>,
}

impl NullProofEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a null proof establishing `statement`.
    pub fn proof(statement: &PublicStatement, valid: bool) -> ZkProof {
        ZkProof {
            proof: json!({"valid": valid, "statement": statement}),
            pub_signals: Vec::new(),
        }
    }

    /// Sleep this long before answering every call.
    pub fn stall(&self, duration: Duration) {
        *lock(&self.stall) = Some(duration);
    }

    pub fn fail_next(&self, error: EngineError) {
        lock(&self.failures).push_back(error);
    }

    /// Panic inside the next call.
    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(CircuitId, ProofKind)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl ProofEngine for NullProofEngine {
    async fn verify(
        &self,
        circuit: &CircuitId,
        key: &[u8],
        proof: &ZkProof,
        context: ProofContext<'_>,
    ) -> Result<PublicStatement, EngineError> {
        let kind = match context {
            ProofContext::Envelope { .. } => ProofKind::Envelope,
            ProofContext::Query { request, .. } => ProofKind::Query(request.id),
        };
        lock(&self.calls).push((circuit.clone(), kind));

        let stall = *lock(&self.stall);
        if let Some(duration) = stall {
            tokio::time::sleep(duration).await;
        }
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("null proof engine asked to panic");
        }
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        if key.is_empty() {
            return Err(EngineError::InvalidProof("empty verification key".into()));
        }

        if !proof.proof.get("valid").and_then(Value::as_bool).unwrap_or(false) {
            return Err(EngineError::InvalidProof("null proof marked invalid".into()));
        }
        let statement = proof
            .proof
            .get("statement")
            .cloned()
            .ok_or_else(|| EngineError::InvalidProof("null proof has no statement".into()))?;
        serde_json::from_value(statement).map_err(|e| EngineError::InvalidProof(e.to_string()))
    }
}
