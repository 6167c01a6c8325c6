//! Fundamental types for zkauth.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: session identifiers, timestamps and the clock abstraction,
//! DIDs, circuit identifiers, the iden3comm authorization messages and the
//! verified-claims / failure shapes recorded as session outcomes.

pub mod circuit;
pub mod claims;
pub mod did;
pub mod error;
pub mod message;
pub mod session;
pub mod time;

pub use circuit::CircuitId;
pub use claims::{ErrorKind, Failure, RequirementClaims, VerifiedClaims};
pub use did::Did;
pub use error::TypesError;
pub use message::{
    AuthorizationRequest, AuthorizationRequestBody, AuthorizationResponse,
    AuthorizationResponseBody, FieldQuery, ProofRequest, ProofResponse, Query, ZkProof, ANY_ISSUER,
};
pub use session::SessionId;
pub use time::{Clock, SystemClock, Timestamp};
