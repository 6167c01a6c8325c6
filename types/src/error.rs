//! Top-level error type for malformed identifiers.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("invalid circuit id: {0}")]
    InvalidCircuit(String),
}
