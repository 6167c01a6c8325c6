use thiserror::Error;
use zkauth_types::SessionId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("session {session} conflict: {reason}")]
    Conflict {
        session: SessionId,
        reason: ConflictReason,
    },

    #[error("session store full ({capacity} sessions)")]
    Full { capacity: usize },
}

/// Why a write was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// `insert` on an id that is already registered.
    AlreadyRegistered,
    /// A response for this challenge is already being verified.
    InFlight,
    /// The session already holds a terminal outcome.
    AlreadyTerminal,
    /// The challenge was replaced after verification started.
    Superseded,
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::AlreadyRegistered => "session id already registered",
            Self::InFlight => "a response is already being verified",
            Self::AlreadyTerminal => "outcome already recorded",
            Self::Superseded => "challenge was superseded",
        })
    }
}
