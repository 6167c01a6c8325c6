use std::time::Duration;
use thiserror::Error;
use zkauth_crypto::RandomError;
use zkauth_store::{ConflictReason, StoreError};
use zkauth_types::{CircuitId, ErrorKind, Failure, SessionId};

/// Why a holder response was rejected.
///
/// `Display` carries diagnostic detail for logs; [`Self::public_message`]
/// is what clients get to see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("response not bound to this challenge: {0}")]
    ChallengeMismatch(String),

    #[error("proof requirement {id} not satisfied: {reason}")]
    ProofRequirementUnmet { id: u32, reason: String },

    #[error("identity state of {did} is stale: replaced {age_secs}s ago, window is {window_secs}s")]
    StaleState {
        did: String,
        age_secs: u64,
        window_secs: u64,
    },

    #[error("identity state of {did} could not be resolved: {reason}")]
    UnresolvableState { did: String, reason: String },

    #[error("no verification key for circuit {circuit}: {reason}")]
    KeyNotFound { circuit: CircuitId, reason: String },

    #[error("schema context for requirement {id} unavailable: {reason}")]
    SchemaUnavailable { id: u32, reason: String },

    #[error("verification timed out after {0:?}")]
    Timeout(Duration),

    #[error("internal verification error: {0}")]
    Internal(String),
}

impl VerificationError {
    pub fn unmet(id: u32, reason: impl Into<String>) -> Self {
        Self::ProofRequirementUnmet {
            id,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::ChallengeMismatch(_) => ErrorKind::ChallengeMismatch,
            Self::ProofRequirementUnmet { .. } => ErrorKind::ProofRequirementUnmet,
            Self::StaleState { .. } => ErrorKind::StaleState,
            Self::UnresolvableState { .. } => ErrorKind::UnresolvableState,
            Self::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            Self::SchemaUnavailable { .. } => ErrorKind::SchemaUnavailable,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn requirement_id(&self) -> Option<u32> {
        match self {
            Self::ProofRequirementUnmet { id, .. } | Self::SchemaUnavailable { id, .. } => {
                Some(*id)
            }
            _ => None,
        }
    }

    /// Client-safe message: no key paths, URLs or collaborator errors.
    pub fn public_message(&self) -> String {
        match self {
            Self::MalformedResponse(_) => "response could not be parsed".into(),
            Self::ChallengeMismatch(_) => "response is not bound to this challenge".into(),
            Self::ProofRequirementUnmet { id, .. } => {
                format!("proof requirement {id} is not satisfied")
            }
            Self::StaleState { .. } => "identity state is outdated".into(),
            Self::UnresolvableState { .. } => "identity state could not be resolved".into(),
            Self::KeyNotFound { circuit, .. } => {
                format!("verifier has no key material for circuit {circuit}")
            }
            Self::SchemaUnavailable { id, .. } => {
                format!("schema for proof requirement {id} is unavailable")
            }
            Self::Timeout(_) => "verification timed out".into(),
            Self::Internal(_) => "internal verification error".into(),
        }
    }

    pub fn to_failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.public_message(),
            requirement_id: self.requirement_id(),
        }
    }
}

/// Errors from issuing a challenge.
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("invalid sign-in policy: {0}")]
    InvalidPolicy(String),

    #[error("session {0} already has a challenge")]
    Conflict(SessionId),

    #[error("session store full ({0} sessions)")]
    StoreFull(usize),

    #[error(transparent)]
    Random(#[from] RandomError),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ChallengeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { session, .. } => ChallengeError::Conflict(session),
            StoreError::Full { capacity } => ChallengeError::StoreFull(capacity),
            other => ChallengeError::Store(other),
        }
    }
}

/// Errors from handling one holder response.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    #[error("session {session}: {reason}")]
    Conflict {
        session: SessionId,
        reason: ConflictReason,
    },

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl HandleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownSession(_) => ErrorKind::UnknownSession,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Verification(e) => e.kind(),
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            Self::UnknownSession(_) => "unknown or expired session".into(),
            Self::Conflict { reason, .. } => reason.to_string(),
            Self::Verification(e) => e.public_message(),
            Self::Store(_) => "internal error".into(),
        }
    }
}

impl From<StoreError> for HandleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(session) => HandleError::UnknownSession(session),
            StoreError::Conflict { session, reason } => HandleError::Conflict { session, reason },
            other => HandleError::Store(other),
        }
    }
}
