use thiserror::Error;
use zkauth_verification::backend::{EngineError, FetchError, ResolveError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("unsupported URI {0}")]
    UnsupportedUri(String),
}

impl ClientError {
    /// Worth retrying: the peer may answer next time.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

impl From<ClientError> for ResolveError {
    fn from(e: ClientError) -> Self {
        if e.is_transient() {
            ResolveError::Transport(e.to_string())
        } else {
            ResolveError::Unresolvable(e.to_string())
        }
    }
}

impl From<ClientError> for FetchError {
    fn from(e: ClientError) -> Self {
        match e {
            e if e.is_transient() => FetchError::Transport(e.to_string()),
            ClientError::InvalidResponse(reason) => FetchError::Invalid(reason),
            other => FetchError::NotFound(other.to_string()),
        }
    }
}

impl From<ClientError> for EngineError {
    fn from(e: ClientError) -> Self {
        // Only an engine verdict may mark a proof invalid.
        EngineError::Transport(e.to_string())
    }
}
