//! HTTP API for zkauth.
//!
//! Endpoints, all under `/api`:
//! - `GET  /sign-in[?sessionId=]` issue a challenge (session id in `x-session-id`)
//! - `POST /callback?sessionId=` wallet posts its JWZ token
//! - `GET  /status?sessionId=` poll the outcome
//! - `GET  /health`
//!
//! Everything else falls through to the optional static front-end.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, AppState, RpcConfig, RpcServer};
