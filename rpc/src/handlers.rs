//! RPC request handlers and their wire types.

use crate::error::RpcError;
use crate::server::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::HeaderName;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use zkauth_types::{AuthorizationRequest, RequirementClaims, SessionId};
use zkauth_verification::SessionStatus;

pub const SESSION_ID_HEADER: HeaderName = HeaderName::from_static("x-session-id");

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

impl SessionQuery {
    fn required(&self) -> Result<SessionId, RpcError> {
        let raw = self
            .session_id
            .as_deref()
            .ok_or_else(|| RpcError::InvalidRequest("sessionId is required".into()))?;
        SessionId::parse(raw).map_err(|e| RpcError::InvalidRequest(e.to_string()))
    }
}

// ── Sign-in ──────────────────────────────────────────────────────────────

pub async fn sign_in(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, RpcError> {
    let requested = match &query.session_id {
        None => None,
        Some(_) if !state.allow_client_session_ids => {
            return Err(RpcError::InvalidRequest(
                "caller-supplied session ids are disabled".into(),
            ))
        }
        Some(_) => Some(query.required()?),
    };
    let issued = state.challenges.issue(requested).await?;
    Ok((
        [(SESSION_ID_HEADER, issued.session_id.to_string())],
        Json::<AuthorizationRequest>(issued.request),
    ))
}

// ── Callback ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub status: &'static str,
    pub message: String,
    pub verified: bool,
    pub attributes: BTreeMap<String, Value>,
    pub requirements: BTreeMap<u32, RequirementClaims>,
}

pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Result<Json<CallbackResponse>, RpcError> {
    let session_id = query.required()?;
    let claims = state.responses.handle(&session_id, body.to_vec()).await?;
    Ok(Json(CallbackResponse {
        status: "success",
        message: "Verification passed successfully".into(),
        verified: true,
        attributes: claims.attributes,
        requirements: claims.requirements,
    }))
}

// ── Status ───────────────────────────────────────────────────────────────

pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionStatus>, RpcError> {
    let session_id = query.required()?;
    Ok(Json(state.status.query(&session_id).await?))
}

// ── Health ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.store.len().await,
    })
}
