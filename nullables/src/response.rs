//! Holder-side test helper: builds JWZ responses to a challenge.

use crate::engine::NullProofEngine;
use zkauth_types::message::{AUTH_RESPONSE_TYPE, MEDIA_TYPE_ZKP};
use zkauth_types::{
    AuthorizationRequest, AuthorizationResponse, AuthorizationResponseBody, CircuitId,
    ProofResponse,
};
use zkauth_verification::backend::{PublicStatement, StateClaim};
use zkauth_verification::{JwzHeader, JwzToken};

/// A statement about a credential of `credential_type` issued by `issuer`
/// to `subject`, with no fields established yet.
pub fn credential_statement(subject: &str, issuer: &str, credential_type: &str) -> PublicStatement {
    PublicStatement {
        subject: Some(subject.to_string()),
        issuer: Some(issuer.to_string()),
        credential_type: Some(credential_type.to_string()),
        ..Default::default()
    }
}

/// Builds the token a wallet would post in answer to a challenge.
///
/// Defaults: correctly bound (`thid`, `to`, `from`), valid envelope proof by
/// the holder, no credential proofs.
#[derive(Clone, Debug)]
pub struct ResponseBuilder {
    message: AuthorizationResponse,
    envelope_circuit: CircuitId,
    envelope: PublicStatement,
    envelope_valid: bool,
}

impl ResponseBuilder {
    pub fn answering(challenge: &AuthorizationRequest, holder: &str) -> Self {
        Self {
            message: AuthorizationResponse {
                id: format!("{}-response", challenge.id),
                typ: Some(MEDIA_TYPE_ZKP.into()),
                message_type: AUTH_RESPONSE_TYPE.into(),
                thid: Some(challenge.thid.clone()),
                from: Some(holder.to_string()),
                to: Some(challenge.audience().to_string()),
                body: AuthorizationResponseBody::default(),
            },
            envelope_circuit: CircuitId::auth_v2(),
            envelope: PublicStatement {
                subject: Some(holder.to_string()),
                ..Default::default()
            },
            envelope_valid: true,
        }
    }

    pub fn thid(mut self, thid: Option<&str>) -> Self {
        self.message.thid = thid.map(str::to_string);
        self
    }

    pub fn to(mut self, to: Option<&str>) -> Self {
        self.message.to = to.map(str::to_string);
        self
    }

    pub fn from(mut self, from: Option<&str>) -> Self {
        self.message.from = from.map(str::to_string);
        self
    }

    pub fn message_type(mut self, message_type: &str) -> Self {
        self.message.message_type = message_type.to_string();
        self
    }

    /// Claim the envelope proof was generated by `subject`.
    pub fn envelope_subject(mut self, subject: &str) -> Self {
        self.envelope.subject = Some(subject.to_string());
        self
    }

    pub fn invalid_envelope(mut self) -> Self {
        self.envelope_valid = false;
        self
    }

    /// The holder proved against identity state `state`.
    pub fn holder_state(mut self, did: &str, state: &str) -> Self {
        self.envelope.states.push(StateClaim {
            did: did.to_string(),
            state: state.to_string(),
        });
        self
    }

    /// Answer requirement `id` with a valid proof establishing `statement`.
    pub fn proof(self, id: u32, circuit: &str, statement: PublicStatement) -> Self {
        self.push(id, circuit, &statement, true)
    }

    pub fn invalid_proof(self, id: u32, circuit: &str) -> Self {
        self.push(id, circuit, &PublicStatement::default(), false)
    }

    fn push(mut self, id: u32, circuit: &str, statement: &PublicStatement, valid: bool) -> Self {
        self.message.body.scope.push(ProofResponse {
            id,
            circuit_id: CircuitId::new(circuit),
            proof: NullProofEngine::proof(statement, valid),
        });
        self
    }

    pub fn build(&self) -> Result<String, serde_json::Error> {
        JwzToken::encode(
            &JwzHeader::groth16(self.envelope_circuit.clone()),
            &self.message,
            &NullProofEngine::proof(&self.envelope, self.envelope_valid),
        )
    }
}
