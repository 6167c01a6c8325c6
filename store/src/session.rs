//! The session model: one challenge and, eventually, one outcome.

use serde::Serialize;
use std::sync::Arc;
use zkauth_types::{AuthorizationRequest, Failure, SessionId, Timestamp, VerifiedClaims};

/// Lifecycle state of a session.
///
/// `Created` and `AwaitingResponse` are both "pending" to clients; the split
/// lets the store refuse a second response while one is being verified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Created,
    AwaitingResponse,
    Verified,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }

    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }
}

/// Terminal result of a session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Outcome {
    Verified(VerifiedClaims),
    Failed(Failure),
}

impl Outcome {
    pub fn state(&self) -> SessionState {
        match self {
            Self::Verified(_) => SessionState::Verified,
            Self::Failed(_) => SessionState::Failed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    pub id: SessionId,
    pub challenge: Arc<AuthorizationRequest>,
    pub state: SessionState,
    /// Bumped every time the challenge under this id is replaced.
    pub generation: u64,
    pub outcome: Option<Outcome>,
    /// The holder's payload exactly as received. Diagnostics only.
    pub raw_response: Option<String>,
    pub created_at: Timestamp,
    pub responded_at: Option<Timestamp>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        challenge: AuthorizationRequest,
        generation: u64,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            challenge: Arc::new(challenge),
            state: SessionState::Created,
            generation,
            outcome: None,
            raw_response: None,
            created_at: now,
            responded_at: None,
        }
    }
}

/// Handed to the response handler by [`crate::SessionStore::begin_response`]:
/// the challenge to verify against and the generation to commit under.
#[derive(Clone, Debug)]
pub struct PendingResponse {
    pub challenge: Arc<AuthorizationRequest>,
    pub generation: u64,
}
