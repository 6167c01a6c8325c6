//! Randomness and hashing helpers for zkauth.
//!
//! - **OS randomness** (`getrandom`) for session identifiers
//! - **UUIDv4** for iden3comm message and thread ids (the challenge nonce)
//! - **Blake2b** fingerprints of holder responses for audit logs

pub mod hash;
pub mod random;

pub use hash::{blake2b_256, fingerprint};
pub use random::{new_session_id, new_thread_id, random_bytes, RandomError};
