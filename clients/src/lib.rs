//! Concrete collaborators for the zkauth verifier.
//!
//! - [`FsKeyLoader`]: circuit keys from `{dir}/{circuitId}/verification_key.json`
//! - [`HttpStateResolver`]: latest identity state from a chain gateway,
//!   `GET {endpoint}/state/{contract}/{did}` → `{"state": .., "timestamp": ..}`
//! - [`HttpDocumentFetcher`]: JSON-LD contexts over HTTP(S), `ipfs://` via a
//!   gateway
//! - [`HttpProofEngine`]: proof verification service, `POST {endpoint}/verify`
//!
//! Transport faults (timeouts, refused connections, 5xx, 429) surface as the
//! ports' transient errors so the verifier's retry policy applies to them.

pub mod documents;
pub mod engine;
pub mod error;
pub mod http;
pub mod keys;
pub mod resolver;

pub use documents::HttpDocumentFetcher;
pub use engine::HttpProofEngine;
pub use error::ClientError;
pub use http::HttpConfig;
pub use keys::FsKeyLoader;
pub use resolver::HttpStateResolver;
