//! Challenge issuance: builds an authorization request from the sign-in
//! policy and registers it against a session.

use crate::error::ChallengeError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zkauth_crypto::{new_session_id, new_thread_id};
use zkauth_store::SessionStore;
use zkauth_types::message::{AUTH_REQUEST_TYPE, MEDIA_TYPE_PLAIN};
use zkauth_types::{
    AuthorizationRequest, AuthorizationRequestBody, CircuitId, Clock, FieldQuery, ProofRequest,
    Query, SessionId, ANY_ISSUER,
};

/// Query parameter carrying the session id on the callback URL.
pub const SESSION_ID_PARAM: &str = "sessionId";

/// One credential disclosure demanded by the sign-in policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisclosurePolicy {
    pub circuit_id: CircuitId,
    pub credential_type: String,
    /// JSON-LD context URI defining `credential_type`.
    pub context: String,
    /// Subject fields to disclose (`{}`) or prove against an operator.
    #[serde(default)]
    pub subject_fields: std::collections::BTreeMap<String, FieldQuery>,
    #[serde(default = "default_allowed_issuers")]
    pub allowed_issuers: Vec<String>,
}

fn default_allowed_issuers() -> Vec<String> {
    vec![ANY_ISSUER.to_string()]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignInPolicy {
    pub reason: String,
    /// The verifier's DID; responses must be addressed to it.
    pub audience: String,
    /// Where the wallet posts its response. `sessionId` is appended.
    pub callback_url: String,
    #[serde(default)]
    pub message: Option<String>,
    pub disclosures: Vec<DisclosurePolicy>,
}

impl SignInPolicy {
    pub const SOCIAL_CREDENTIAL_CONTEXT: &'static str =
        "ipfs://QmdGrFoZrEgUoiS4QN77YSWY5LfcQDKQAzBTtkG5dLw1YV";

    /// "Verify your Social Credential": disclose `walletAddress` from a
    /// `SocialCredential` issued by anyone.
    pub fn social_credential(audience: impl Into<String>, callback_url: impl Into<String>) -> Self {
        Self {
            reason: "Verify your Social Credential".into(),
            audience: audience.into(),
            callback_url: callback_url.into(),
            message: None,
            disclosures: vec![DisclosurePolicy {
                circuit_id: CircuitId::new(CircuitId::ATOMIC_QUERY_MTP_V2),
                credential_type: "SocialCredential".into(),
                context: Self::SOCIAL_CREDENTIAL_CONTEXT.into(),
                subject_fields: [("walletAddress".to_string(), FieldQuery::disclosure())]
                    .into_iter()
                    .collect(),
                allowed_issuers: default_allowed_issuers(),
            }],
        }
    }

    pub fn validate(&self) -> Result<(), ChallengeError> {
        let invalid = |msg: String| Err(ChallengeError::InvalidPolicy(msg));
        if self.disclosures.is_empty() {
            return invalid("at least one disclosure is required".into());
        }
        if self.audience.trim().is_empty() {
            return invalid("audience must not be empty".into());
        }
        if !(self.callback_url.starts_with("http://") || self.callback_url.starts_with("https://"))
        {
            return invalid(format!("callback url {:?} is not http(s)", self.callback_url));
        }
        for (i, d) in self.disclosures.iter().enumerate() {
            if d.credential_type.is_empty() || d.context.is_empty() {
                return invalid(format!("disclosure {} needs a credential type and context", i + 1));
            }
            if d.allowed_issuers.is_empty() {
                return invalid(format!("disclosure {} allows no issuer", i + 1));
            }
        }
        Ok(())
    }
}

/// What happens when a challenge is requested for an id that already has one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReissuePolicy {
    /// Refuse with `Conflict`.
    #[default]
    Reject,
    /// Atomically replace the old challenge; any outcome it had is dropped.
    Supersede,
}

#[derive(Clone, Debug)]
pub struct IssuedChallenge {
    pub session_id: SessionId,
    pub request: AuthorizationRequest,
    pub generation: u64,
}

pub struct ChallengeBuilder {
    store: Arc<dyn SessionStore>,
    policy: SignInPolicy,
    reissue: ReissuePolicy,
    clock: Arc<dyn Clock>,
}

impl ChallengeBuilder {
    pub fn new(
        store: Arc<dyn SessionStore>,
        policy: SignInPolicy,
        reissue: ReissuePolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ChallengeError> {
        policy.validate()?;
        Ok(Self {
            store,
            policy,
            reissue,
            clock,
        })
    }

    pub fn policy(&self) -> &SignInPolicy {
        &self.policy
    }

    /// Build the authorization request for `session_id`. Pure apart from
    /// the random thread id.
    pub fn build(&self, session_id: &SessionId) -> AuthorizationRequest {
        let thid = new_thread_id();
        let scope = self
            .policy
            .disclosures
            .iter()
            .zip(1u32..)
            .map(|(d, id)| ProofRequest {
                id,
                circuit_id: d.circuit_id.clone(),
                query: Query {
                    allowed_issuers: d.allowed_issuers.clone(),
                    context: d.context.clone(),
                    credential_type: d.credential_type.clone(),
                    credential_subject: d.subject_fields.clone(),
                },
            })
            .collect();

        AuthorizationRequest {
            id: thid.clone(),
            thid,
            typ: MEDIA_TYPE_PLAIN.into(),
            message_type: AUTH_REQUEST_TYPE.into(),
            from: self.policy.audience.clone(),
            body: AuthorizationRequestBody {
                callback_url: callback_with_session(&self.policy.callback_url, session_id),
                reason: self.policy.reason.clone(),
                message: self.policy.message.clone(),
                scope,
            },
        }
    }

    /// Issue a challenge, generating a session id when none is given.
    pub async fn issue(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<IssuedChallenge, ChallengeError> {
        let session_id = match session_id {
            Some(id) => id,
            None => new_session_id()?,
        };
        let request = self.build(&session_id);
        let now = self.clock.now();

        let session = match self.reissue {
            ReissuePolicy::Reject => {
                self.store
                    .insert(session_id.clone(), request.clone(), now)
                    .await?
            }
            ReissuePolicy::Supersede => {
                self.store
                    .put(session_id.clone(), request.clone(), now)
                    .await?
            }
        };

        tracing::info!(
            session_id = %session_id,
            thid = %request.thid,
            generation = session.generation,
            requirements = request.body.scope.len(),
            "challenge issued"
        );

        Ok(IssuedChallenge {
            session_id,
            request,
            generation: session.generation,
        })
    }
}

fn callback_with_session(base: &str, session_id: &SessionId) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}{SESSION_ID_PARAM}={session_id}")
}
