//! iden3comm authorization messages.
//!
//! The request is what the verifier renders as a QR code / deep link; the
//! response is the payload of the holder's JWZ token.

use crate::CircuitId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const AUTH_REQUEST_TYPE: &str = "https://iden3-communication.io/authorization/1.0/request";
pub const AUTH_RESPONSE_TYPE: &str = "https://iden3-communication.io/authorization/1.0/response";
pub const MEDIA_TYPE_PLAIN: &str = "application/iden3comm-plain-json";
pub const MEDIA_TYPE_ZKP: &str = "application/iden3-zkp-json";

/// Issuer wildcard in [`Query::allowed_issuers`].
pub const ANY_ISSUER: &str = "*";

// ── Request ──────────────────────────────────────────────────────────────

/// A challenge: the verifier's authorization request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub id: String,
    /// Thread id. Random per challenge; the response must echo it.
    pub thid: String,
    pub typ: String,
    #[serde(rename = "type")]
    pub message_type: String,
    /// The verifier's own DID (the audience of the response).
    pub from: String,
    pub body: AuthorizationRequestBody,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequestBody {
    #[serde(rename = "callbackUrl")]
    pub callback_url: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub scope: Vec<ProofRequest>,
}

impl AuthorizationRequest {
    pub fn audience(&self) -> &str {
        &self.from
    }

    pub fn requirements(&self) -> &[ProofRequest] {
        &self.body.scope
    }

    pub fn requirement(&self, id: u32) -> Option<&ProofRequest> {
        self.body.scope.iter().find(|r| r.id == id)
    }
}

/// One demanded disclosure within a challenge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub id: u32,
    #[serde(rename = "circuitId")]
    pub circuit_id: CircuitId,
    pub query: Query,
}

/// The predicate a credential proof must satisfy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "allowedIssuers")]
    pub allowed_issuers: Vec<String>,
    /// JSON-LD context URI defining `credential_type`.
    pub context: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    #[serde(
        rename = "credentialSubject",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub credential_subject: BTreeMap<String, FieldQuery>,
}

impl Query {
    pub fn allows_issuer(&self, issuer: &str) -> bool {
        self.allowed_issuers
            .iter()
            .any(|allowed| allowed == ANY_ISSUER || allowed == issuer)
    }

    /// Names of the fields requested as selective disclosures.
    pub fn disclosed_fields(&self) -> impl Iterator<Item = &str> {
        self.credential_subject
            .iter()
            .filter(|(_, q)| q.is_disclosure())
            .map(|(name, _)| name.as_str())
    }
}

/// Query on one credential subject field.
///
/// `{}` asks for the value itself; `{"$lt": 20}` asks for a proof that the
/// value satisfies the operator without revealing it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldQuery(pub BTreeMap<String, Value>);

impl FieldQuery {
    pub fn disclosure() -> Self {
        Self::default()
    }

    pub fn predicate(operator: impl Into<String>, operand: Value) -> Self {
        let mut ops = BTreeMap::new();
        ops.insert(operator.into(), operand);
        Self(ops)
    }

    pub fn is_disclosure(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Response ─────────────────────────────────────────────────────────────

/// The holder's answer, carried as the payload of a JWZ token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub body: AuthorizationResponseBody,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResponseBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub scope: Vec<ProofResponse>,
}

/// A proof answering the [`ProofRequest`] with the same `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofResponse {
    pub id: u32,
    #[serde(rename = "circuitId")]
    pub circuit_id: CircuitId,
    #[serde(flatten)]
    pub proof: ZkProof,
}

/// Proof data plus public signals, opaque to everything but the proof engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZkProof {
    pub proof: Value,
    pub pub_signals: Vec<String>,
}
