//! Decentralized identifiers.
//!
//! Only the `did:<method>:<blockchain>:<network>:<id>` shape carries enough
//! information to pick a state resolver; shorter DIDs parse but have no
//! [`Did::network`].

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed DID such as `did:iden3:polygon:amoy:x6x5sor7zpx...`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did {
    raw: String,
    method: String,
    chain: Option<(String, String)>,
    id: String,
}

impl Did {
    pub const SCHEME: &'static str = "did";

    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() < 3 || parts[0] != Self::SCHEME {
            return Err(TypesError::InvalidDid(raw.to_string()));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(TypesError::InvalidDid(raw.to_string()));
        }
        let (chain, id) = match parts.len() {
            3 => (None, parts[2]),
            5 => (
                Some((parts[2].to_string(), parts[3].to_string())),
                parts[4],
            ),
            _ => return Err(TypesError::InvalidDid(raw.to_string())),
        };
        Ok(Self {
            raw: raw.to_string(),
            method: parts[1].to_string(),
            chain,
            id: id.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// DID method, e.g. `iden3` or `polygonid`.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Method-specific identifier (the last segment).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolver network key in `blockchain:network` form, e.g. `polygon:amoy`.
    pub fn network(&self) -> Option<String> {
        self.chain
            .as_ref()
            .map(|(blockchain, network)| format!("{blockchain}:{network}"))
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for Did {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.raw
    }
}
