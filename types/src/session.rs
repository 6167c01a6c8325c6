//! Session identifier.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier correlating a challenge with its eventual outcome.
///
/// Server-generated ids are 32 random bytes rendered as lowercase hex.
/// Caller-supplied ids go through [`SessionId::parse`]; their
/// unguessability is the caller's responsibility.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub const MIN_LEN: usize = 1;
    pub const MAX_LEN: usize = 128;

    /// Parse and validate an externally supplied session id.
    ///
    /// Accepts `[A-Za-z0-9_-]` with a length between [`Self::MIN_LEN`] and
    /// [`Self::MAX_LEN`].
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        if raw.len() < Self::MIN_LEN || raw.len() > Self::MAX_LEN {
            return Err(TypesError::InvalidSessionId(format!(
                "length {} outside {}..={}",
                raw.len(),
                Self::MIN_LEN,
                Self::MAX_LEN
            )));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(TypesError::InvalidSessionId(
                "only [A-Za-z0-9_-] allowed".into(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// Build an id from random bytes (hex encoded).
    pub fn from_random_bytes(bytes: &[u8; 32]) -> Self {
        use fmt::Write;
        let mut s = String::with_capacity(64);
        for b in bytes {
            let _ = write!(s, "{b:02x}");
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_render_as_64_hex_chars() {
        let id = SessionId::from_random_bytes(&[0xab; 32]);
        assert_eq!(id.as_str().len(), 64);
        assert!(id.as_str().chars().all(|c| c == 'a' || c == 'b'));
        assert_eq!(SessionId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn rejects_empty_and_oversized_ids() {
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse(&"a".repeat(129)).is_err());
        assert!(SessionId::parse("s1").is_ok());
    }

    #[test]
    fn rejects_url_metacharacters() {
        assert!(SessionId::parse("s1&x=1").is_err());
        assert!(SessionId::parse("s1/..").is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<SessionId, _> = serde_json::from_str("\"s1-session-0000000\"");
        assert!(ok.is_ok());
        let bad: Result<SessionId, _> = serde_json::from_str("\"s 1\"");
        assert!(bad.is_err());
    }
}
