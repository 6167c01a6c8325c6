//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the verifier talks to (clock, key storage, chain
//! state, schema documents, the proof engine) has a test implementation
//! here that:
//! - returns deterministic, programmable values
//! - can be told to fail or stall on demand
//! - never touches the filesystem or network
//!
//! Usage: build a `ProtocolVerifier` from these instead of the clients.

pub mod clock;
pub mod documents;
pub mod engine;
pub mod keys;
pub mod resolver;
pub mod response;

pub use clock::NullClock;
pub use documents::NullDocumentFetcher;
pub use engine::NullProofEngine;
pub use keys::NullKeyLoader;
pub use resolver::NullStateResolver;
pub use response::{credential_statement, ResponseBuilder};

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
