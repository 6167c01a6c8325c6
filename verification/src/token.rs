//! JWZ (JSON Web Zero-knowledge) tokens.
//!
//! Compact form: `base64url(header) . base64url(payload) . base64url(proof)`.
//! The header names the envelope circuit, the payload is the authorization
//! response message, and the proof segment is a `{proof, pub_signals}`
//! object committing to `header.payload`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zkauth_types::{AuthorizationResponse, CircuitId, ZkProof};

pub const ALG_GROTH16: &str = "groth16";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JwzHeader {
    pub alg: String,
    #[serde(rename = "circuitId")]
    pub circuit_id: CircuitId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crit: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl JwzHeader {
    pub fn groth16(circuit_id: CircuitId) -> Self {
        Self {
            alg: ALG_GROTH16.into(),
            circuit_id,
            crit: vec!["circuitId".into()],
            typ: Some(zkauth_types::message::MEDIA_TYPE_ZKP.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is not valid UTF-8")]
    NotUtf8,

    #[error("expected 3 dot-separated segments, found {0}")]
    Segments(usize),

    #[error("{segment} segment is not base64url: {reason}")]
    Encoding {
        segment: &'static str,
        reason: String,
    },

    #[error("{segment} segment is not valid JSON: {reason}")]
    Json {
        segment: &'static str,
        reason: String,
    },

    #[error("unsupported algorithm {0:?}")]
    Algorithm(String),
}

/// A parsed JWZ token.
#[derive(Clone, Debug)]
pub struct JwzToken {
    pub header: JwzHeader,
    pub message: AuthorizationResponse,
    pub proof: ZkProof,
    signing_input: String,
}

impl JwzToken {
    pub fn parse(raw: &[u8]) -> Result<Self, TokenError> {
        let text = std::str::from_utf8(raw).map_err(|_| TokenError::NotUtf8)?;
        let text = text.trim();
        let segments: Vec<&str> = text.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::Segments(segments.len()));
        }

        let header: JwzHeader = decode_segment("header", segments[0])?;
        if header.alg != ALG_GROTH16 {
            return Err(TokenError::Algorithm(header.alg));
        }
        let message: AuthorizationResponse = decode_segment("payload", segments[1])?;
        let proof: ZkProof = decode_segment("proof", segments[2])?;

        Ok(Self {
            header,
            message,
            proof,
            signing_input: format!("{}.{}", segments[0], segments[1]),
        })
    }

    /// Encode a token. The proof is taken as given; producing it is the
    /// wallet's job.
    pub fn encode(
        header: &JwzHeader,
        message: &AuthorizationResponse,
        proof: &ZkProof,
    ) -> Result<String, serde_json::Error> {
        Ok(format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(message)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(proof)?),
        ))
    }

    /// The `header.payload` bytes the envelope proof commits to.
    pub fn signing_input(&self) -> &[u8] {
        self.signing_input.as_bytes()
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &'static str,
    encoded: &str,
) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|e| TokenError::Encoding {
            segment,
            reason: e.to_string(),
        })?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Json {
        segment,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zkauth_types::message::AUTH_RESPONSE_TYPE;
    use zkauth_types::AuthorizationResponseBody;

    fn message() -> AuthorizationResponse {
        AuthorizationResponse {
            id: "r1".into(),
            typ: Some(zkauth_types::message::MEDIA_TYPE_ZKP.into()),
            message_type: AUTH_RESPONSE_TYPE.into(),
            thid: Some("t1".into()),
            from: Some("did:iden3:polygon:amoy:holder".into()),
            to: Some("did:iden3:polygon:amoy:verifier".into()),
            body: AuthorizationResponseBody::default(),
        }
    }

    fn proof() -> ZkProof {
        ZkProof {
            proof: json!({"pi_a": ["1", "2", "1"], "protocol": "groth16"}),
            pub_signals: vec!["42".into()],
        }
    }

    #[test]
    fn parses_encoded_token() {
        let header = JwzHeader::groth16(CircuitId::auth_v2());
        let raw = JwzToken::encode(&header, &message(), &proof()).unwrap();
        let token = JwzToken::parse(raw.as_bytes()).unwrap();
        assert_eq!(token.header, header);
        assert_eq!(token.message, message());
        assert_eq!(token.proof, proof());
        let (head, _) = raw.rsplit_once('.').unwrap();
        assert_eq!(token.signing_input(), head.as_bytes());
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let raw = JwzToken::encode(&JwzHeader::groth16(CircuitId::auth_v2()), &message(), &proof())
            .unwrap();
        assert!(JwzToken::parse(format!("{raw}\n").as_bytes()).is_ok());
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(matches!(
            JwzToken::parse(b"abc.def"),
            Err(TokenError::Segments(2))
        ));
    }

    #[test]
    fn rejects_plain_json_body() {
        let body = serde_json::to_vec(&message()).unwrap();
        assert!(JwzToken::parse(&body).is_err());
    }

    #[test]
    fn rejects_non_base64_segment() {
        assert!(matches!(
            JwzToken::parse(b"***.e30.e30"),
            Err(TokenError::Encoding { segment: "header", .. })
        ));
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let mut header = JwzHeader::groth16(CircuitId::auth_v2());
        header.alg = "none".into();
        let raw = JwzToken::encode(&header, &message(), &proof()).unwrap();
        assert!(matches!(
            JwzToken::parse(raw.as_bytes()),
            Err(TokenError::Algorithm(_))
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(matches!(
            JwzToken::parse(&[0xff, 0xfe, b'.', b'.']),
            Err(TokenError::NotUtf8)
        ));
    }
}
