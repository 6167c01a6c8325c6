//! Unguessable identifiers.

use thiserror::Error;
use zkauth_types::SessionId;

#[derive(Debug, Error)]
#[error("OS randomness unavailable: {0}")]
pub struct RandomError(String);

/// Fill a fixed-size buffer from the OS CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], RandomError> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).map_err(|e| RandomError(e.to_string()))?;
    Ok(buf)
}

/// A fresh session id: 256 bits of OS randomness, hex encoded.
pub fn new_session_id() -> Result<SessionId, RandomError> {
    Ok(SessionId::from_random_bytes(&random_bytes::<32>()?))
}

/// A fresh iden3comm message/thread id (UUIDv4).
pub fn new_thread_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
