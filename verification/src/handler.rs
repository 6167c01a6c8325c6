//! Response handling: correlate a holder response with its challenge,
//! verify it and commit exactly one outcome.

use crate::error::{HandleError, VerificationError};
use crate::verifier::ProofVerifier;
use std::sync::Arc;
use tokio::task::JoinHandle;
use zkauth_crypto::fingerprint;
use zkauth_store::{Outcome, SessionStore};
use zkauth_types::{Clock, SessionId, VerifiedClaims};

#[derive(Clone)]
pub struct ResponseHandler {
    store: Arc<dyn SessionStore>,
    verifier: Arc<dyn ProofVerifier>,
    clock: Arc<dyn Clock>,
}

impl ResponseHandler {
    pub fn new(
        store: Arc<dyn SessionStore>,
        verifier: Arc<dyn ProofVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            verifier,
            clock,
        }
    }

    /// Verify `raw` against the challenge of `session_id` and record the
    /// outcome.
    ///
    /// Verification runs on its own task: dropping the returned future (a
    /// disconnected HTTP client) does not stop it, and a panicking verifier
    /// is recorded as `Internal`.
    pub async fn handle(
        &self,
        session_id: &SessionId,
        raw: Vec<u8>,
    ) -> Result<VerifiedClaims, HandleError> {
        let pending = self.store.begin_response(session_id).await?;
        let raw: Arc<[u8]> = raw.into();
        let print = fingerprint(&raw);
        tracing::info!(
            session_id = %session_id,
            generation = pending.generation,
            response = %print,
            bytes = raw.len(),
            "response accepted for verification"
        );

        let store = self.store.clone();
        let verifier = self.verifier.clone();
        let clock = self.clock.clone();
        let id = session_id.clone();

        let task: JoinHandle<Result<VerifiedClaims, HandleError>> = tokio::spawn(async move {
            let verdict = {
                let raw = raw.clone();
                let challenge = pending.challenge.clone();
                match tokio::spawn(async move { verifier.verify(&raw, &challenge).await }).await {
                    Ok(verdict) => verdict,
                    Err(e) => Err(VerificationError::Internal(format!(
                        "verifier task failed: {e}"
                    ))),
                }
            };

            let outcome = match &verdict {
                Ok(claims) => Outcome::Verified(claims.clone()),
                Err(e) => Outcome::Failed(e.to_failure()),
            };
            let raw_text = String::from_utf8_lossy(&raw).into_owned();
            store
                .set_outcome(&id, pending.generation, outcome, Some(raw_text), clock.now())
                .await?;

            match &verdict {
                Ok(claims) => tracing::info!(
                    session_id = %id,
                    response = %print,
                    sender = %claims.sender,
                    attributes = claims.attributes.len(),
                    "session verified"
                ),
                Err(e) => tracing::warn!(
                    session_id = %id,
                    response = %print,
                    kind = %e.kind(),
                    error = %e,
                    "session failed verification"
                ),
            }
            Ok(verdict?)
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(HandleError::Verification(VerificationError::Internal(
                format!("response task failed: {e}"),
            ))),
        }
    }
}
