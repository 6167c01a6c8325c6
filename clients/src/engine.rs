//! Proof verification delegated to an HTTP service.
//!
//! `POST {endpoint}/verify` with
//! `{"circuitId", "verificationKey", "proof", "context"}`; the service
//! answers `{"valid": true, "statement": {..}}` or
//! `{"valid": false, "error": ".."}`, and `404` for an unknown circuit.

use crate::error::ClientError;
use crate::http::{join, post_json, HttpConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zkauth_types::{CircuitId, ProofRequest, ZkProof};
use zkauth_verification::backend::{EngineError, ProofContext, ProofEngine, PublicStatement};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    circuit_id: &'a CircuitId,
    verification_key: Value,
    proof: &'a ZkProof,
    context: WireContext<'a>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum WireContext<'a> {
    #[serde(rename_all = "camelCase")]
    Envelope { signing_input: String },
    Query {
        request: &'a ProofRequest,
        schema: &'a Value,
        sender: &'a str,
    },
}

impl<'a> From<ProofContext<'a>> for WireContext<'a> {
    fn from(context: ProofContext<'a>) -> Self {
        match context {
            ProofContext::Envelope { signing_input } => WireContext::Envelope {
                signing_input: String::from_utf8_lossy(signing_input).into_owned(),
            },
            ProofContext::Query {
                request,
                schema,
                sender,
            } => WireContext::Query {
                request,
                schema,
                sender: sender.as_str(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    valid: bool,
    #[serde(default)]
    statement: Option<PublicStatement>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone, Debug)]
pub struct HttpProofEngine {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpProofEngine {
    pub fn new(
        endpoint: impl Into<String>,
        config: &HttpConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: config.client()?,
            endpoint: endpoint.into(),
        })
    }
}

/// Keys on disk are snarkjs JSON; anything else is passed through as text.
fn key_value(key: &[u8]) -> Value {
    serde_json::from_slice(key)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(key).into_owned()))
}

#[async_trait]
impl ProofEngine for HttpProofEngine {
    async fn verify(
        &self,
        circuit: &CircuitId,
        key: &[u8],
        proof: &ZkProof,
        context: ProofContext<'_>,
    ) -> Result<PublicStatement, EngineError> {
        let url = join(&self.endpoint, "verify");
        let body = VerifyRequest {
            circuit_id: circuit,
            verification_key: key_value(key),
            proof,
            context: context.into(),
        };
        let verdict: VerifyResponse = match post_json(&self.http_client, &url, &body).await {
            Ok(verdict) => verdict,
            Err(e) if e.is_not_found() => return Err(EngineError::Unsupported(circuit.clone())),
            Err(e) => return Err(e.into()),
        };

        match verdict {
            VerifyResponse {
                valid: true,
                statement: Some(statement),
                ..
            } => Ok(statement),
            VerifyResponse { valid: true, .. } => Err(ClientError::InvalidResponse(
                "valid proof without a statement".into(),
            )
            .into()),
            VerifyResponse { error, .. } => Err(EngineError::InvalidProof(
                error.unwrap_or_else(|| "rejected by proof engine".into()),
            )),
        }
    }
}
