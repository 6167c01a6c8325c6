//! Session storage for zkauth.
//!
//! The rest of the workspace depends only on the [`SessionStore`] trait; the
//! server owns one [`MemorySessionStore`] and injects it into every handler.
//!
//! Write discipline:
//! - `put` replaces a session atomically (new challenge, outcome cleared,
//!   generation bumped); `insert` refuses to replace.
//! - `begin_response` admits exactly one response per challenge.
//! - `set_outcome` is write-once per generation: the first writer wins and
//!   every later writer gets [`StoreError::Conflict`].

pub mod error;
pub mod memory;
pub mod reaper;
pub mod session;

pub use error::{ConflictReason, StoreError};
pub use memory::MemorySessionStore;
pub use reaper::SessionReaper;
pub use session::{Outcome, PendingResponse, Session, SessionState};

use async_trait::async_trait;
use zkauth_types::{AuthorizationRequest, SessionId, Timestamp};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create or replace the session for `id` in state `Created`.
    async fn put(
        &self,
        id: SessionId,
        challenge: AuthorizationRequest,
        now: Timestamp,
    ) -> Result<Session, StoreError>;

    /// Create the session for `id`; `Conflict` if it already exists.
    async fn insert(
        &self,
        id: SessionId,
        challenge: AuthorizationRequest,
        now: Timestamp,
    ) -> Result<Session, StoreError>;

    async fn get(&self, id: &SessionId) -> Result<Session, StoreError>;

    /// Move `Created → AwaitingResponse` and hand out the challenge.
    async fn begin_response(&self, id: &SessionId) -> Result<PendingResponse, StoreError>;

    /// Commit the terminal outcome for the given generation.
    async fn set_outcome(
        &self,
        id: &SessionId,
        generation: u64,
        outcome: Outcome,
        raw_response: Option<String>,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Drop sessions created at least `ttl_secs` before `now`.
    async fn reap(&self, now: Timestamp, ttl_secs: u64) -> usize;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
