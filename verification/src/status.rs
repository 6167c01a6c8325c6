//! Read-only session status for polling clients.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use zkauth_store::{Outcome, SessionStore, StoreError};
use zkauth_types::{Failure, SessionId, VerifiedClaims};

/// Externally visible status. `Created` and `AwaitingResponse` both read as
/// `pending`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Success(VerifiedClaims),
    Failed(Failure),
}

impl SessionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    #[error("store error: {0}")]
    Store(StoreError),
}

#[derive(Clone)]
pub struct StatusQuery {
    store: Arc<dyn SessionStore>,
}

impl StatusQuery {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn query(&self, session_id: &SessionId) -> Result<SessionStatus, StatusError> {
        let session = self.store.get(session_id).await.map_err(|e| match e {
            StoreError::NotFound(id) => StatusError::UnknownSession(id),
            other => StatusError::Store(other),
        })?;
        Ok(match session.outcome {
            None => SessionStatus::Pending,
            Some(Outcome::Verified(claims)) => SessionStatus::Success(claims),
            Some(Outcome::Failed(failure)) => SessionStatus::Failed(failure),
        })
    }
}
