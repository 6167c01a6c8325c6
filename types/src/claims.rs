//! What a successful verification yields, and how a failed one is classified.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Attributes established by a verified response.
///
/// `attributes` holds exactly the selectively disclosed fields the
/// challenge asked for, merged across requirements.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    /// DID of the holder that produced the response.
    pub sender: String,
    pub attributes: BTreeMap<String, Value>,
    pub requirements: BTreeMap<u32, RequirementClaims>,
}

/// Per-requirement detail of a verified response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementClaims {
    #[serde(rename = "circuitId")]
    pub circuit_id: String,
    #[serde(rename = "credentialType")]
    pub credential_type: String,
    pub issuer: String,
    pub disclosed: BTreeMap<String, Value>,
    /// Fields proven against an operator without disclosing the value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proven: Vec<String>,
}

/// Client-visible classification of a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MalformedResponse,
    ChallengeMismatch,
    ProofRequirementUnmet,
    StaleState,
    UnresolvableState,
    KeyNotFound,
    SchemaUnavailable,
    UnknownSession,
    Conflict,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedResponse => "MalformedResponse",
            Self::ChallengeMismatch => "ChallengeMismatch",
            Self::ProofRequirementUnmet => "ProofRequirementUnmet",
            Self::StaleState => "StaleState",
            Self::UnresolvableState => "UnresolvableState",
            Self::KeyNotFound => "KeyNotFound",
            Self::SchemaUnavailable => "SchemaUnavailable",
            Self::UnknownSession => "UnknownSession",
            Self::Conflict => "Conflict",
            Self::Timeout => "Timeout",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded verification failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    #[serde(rename = "error")]
    pub kind: ErrorKind,
    /// Human-readable message, safe to show to clients.
    pub message: String,
    #[serde(
        rename = "requirementId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub requirement_id: Option<u32>,
}
