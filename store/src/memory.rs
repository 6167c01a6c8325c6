//! In-process session store.
//!
//! One `tokio::sync::RwLock` guards the whole map; every operation is a
//! single short critical section with no I/O, so per-key ordering is the
//! lock's ordering.

use crate::session::{Outcome, PendingResponse, Session, SessionState};
use crate::{ConflictReason, SessionStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use zkauth_types::{AuthorizationRequest, SessionId, Timestamp};

/// Default cap on live sessions.
pub const DEFAULT_CAPACITY: usize = 100_000;

struct Inner {
    sessions: HashMap<SessionId, Session>,
    next_generation: u64,
}

impl Inner {
    fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

/// Server-lifetime session map.
pub struct MemorySessionStore {
    inner: RwLock<Inner>,
    capacity: usize,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store refusing new sessions beyond `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                sessions: HashMap::new(),
                next_generation: 0,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        id: SessionId,
        challenge: AuthorizationRequest,
        now: Timestamp,
    ) -> Result<Session, StoreError> {
        let mut inner = self.inner.write().await;
        let replacing = inner.sessions.contains_key(&id);
        if !replacing && inner.sessions.len() >= self.capacity {
            return Err(StoreError::Full {
                capacity: self.capacity,
            });
        }
        let generation = inner.next_generation();
        let session = Session::new(id.clone(), challenge, generation, now);
        inner.sessions.insert(id, session.clone());
        if replacing {
            tracing::debug!(session_id = %session.id, generation, "challenge superseded");
        }
        Ok(session)
    }

    async fn insert(
        &self,
        id: SessionId,
        challenge: AuthorizationRequest,
        now: Timestamp,
    ) -> Result<Session, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&id) {
            return Err(StoreError::Conflict {
                session: id,
                reason: ConflictReason::AlreadyRegistered,
            });
        }
        if inner.sessions.len() >= self.capacity {
            return Err(StoreError::Full {
                capacity: self.capacity,
            });
        }
        let generation = inner.next_generation();
        let session = Session::new(id.clone(), challenge, generation, now);
        inner.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> Result<Session, StoreError> {
        self.inner
            .read()
            .await
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn begin_response(&self, id: &SessionId) -> Result<PendingResponse, StoreError> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        match session.state {
            SessionState::Created => {
                session.state = SessionState::AwaitingResponse;
                Ok(PendingResponse {
                    challenge: session.challenge.clone(),
                    generation: session.generation,
                })
            }
            SessionState::AwaitingResponse => Err(StoreError::Conflict {
                session: id.clone(),
                reason: ConflictReason::InFlight,
            }),
            SessionState::Verified | SessionState::Failed => Err(StoreError::Conflict {
                session: id.clone(),
                reason: ConflictReason::AlreadyTerminal,
            }),
        }
    }

    async fn set_outcome(
        &self,
        id: &SessionId,
        generation: u64,
        outcome: Outcome,
        raw_response: Option<String>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if session.generation != generation {
            return Err(StoreError::Conflict {
                session: id.clone(),
                reason: ConflictReason::Superseded,
            });
        }
        if session.state.is_terminal() {
            return Err(StoreError::Conflict {
                session: id.clone(),
                reason: ConflictReason::AlreadyTerminal,
            });
        }
        session.state = outcome.state();
        session.outcome = Some(outcome);
        session.raw_response = raw_response;
        session.responded_at = Some(now);
        Ok(())
    }

    async fn reap(&self, now: Timestamp, ttl_secs: u64) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner
            .sessions
            .retain(|_, session| !session.created_at.has_expired(ttl_secs, now));
        before - inner.sessions.len()
    }

    async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}
