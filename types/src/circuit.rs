//! Circuit identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names a proof circuit and, with it, the verification key that checks its
/// proofs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircuitId(String);

impl CircuitId {
    /// Authentication circuit proving control of the sender identity.
    pub const AUTH_V2: &'static str = "authV2";
    /// Credential query, Merkle-tree inclusion proof of the credential.
    pub const ATOMIC_QUERY_MTP_V2: &'static str = "credentialAtomicQueryMTPV2";
    /// Credential query, issuer signature proof of the credential.
    pub const ATOMIC_QUERY_SIG_V2: &'static str = "credentialAtomicQuerySigV2";
    pub const ATOMIC_QUERY_V3: &'static str = "credentialAtomicQueryV3-beta.1";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn auth_v2() -> Self {
        Self::new(Self::AUTH_V2)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is safe to use as a single path segment.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CircuitId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_circuits_are_path_safe() {
        for id in [
            CircuitId::AUTH_V2,
            CircuitId::ATOMIC_QUERY_MTP_V2,
            CircuitId::ATOMIC_QUERY_SIG_V2,
            CircuitId::ATOMIC_QUERY_V3,
        ] {
            assert!(CircuitId::new(id).is_path_safe(), "{id}");
        }
    }

    #[test]
    fn traversal_is_not_path_safe() {
        assert!(!CircuitId::new("..").is_path_safe());
        assert!(!CircuitId::new("../etc").is_path_safe());
        assert!(!CircuitId::new("").is_path_safe());
    }
}
