//! Challenge-response verification for zkauth.
//!
//! Three operations over one injected [`zkauth_store::SessionStore`]:
//! 1. **Challenge**: [`ChallengeBuilder`] turns the sign-in policy into an
//!    iden3comm authorization request bound to a session.
//! 2. **Response**: [`ResponseHandler`] runs the holder's JWZ token through a
//!    [`ProofVerifier`] and commits exactly one outcome.
//! 3. **Status**: [`StatusQuery`] reports pending / success / failed.
//!
//! The cryptography and trust anchors sit behind the ports in [`backend`];
//! [`ProtocolVerifier`] is the adapter that applies the protocol rules on
//! top of them.

pub mod backend;
pub mod challenge;
pub mod error;
pub mod freshness;
pub mod handler;
pub mod retry;
pub mod status;
pub mod token;
pub mod verifier;

pub use backend::{
    DocumentFetcher, FieldProof, KeyLoader, ProofContext, ProofEngine, PublicStatement,
    ResolvedState, StateClaim, StateResolver,
};
pub use challenge::{
    ChallengeBuilder, DisclosurePolicy, IssuedChallenge, ReissuePolicy, SignInPolicy,
};
pub use error::{ChallengeError, HandleError, VerificationError};
pub use freshness::Freshness;
pub use handler::ResponseHandler;
pub use retry::RetryPolicy;
pub use status::{SessionStatus, StatusError, StatusQuery};
pub use token::{JwzHeader, JwzToken};
pub use verifier::{ProofVerifier, ProtocolVerifier, VerifierConfig};
