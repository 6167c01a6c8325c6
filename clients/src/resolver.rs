//! Identity state from an HTTP chain gateway.

use crate::http::{get_json, join, HttpConfig};
use async_trait::async_trait;
use serde::Deserialize;
use zkauth_types::{Did, Timestamp};
use zkauth_verification::backend::{ResolveError, ResolvedState, StateResolver};

/// Gateway answer for `GET /state/{contract}/{did}/{state}`.
#[derive(Debug, Deserialize)]
struct StateResponse {
    state: String,
    /// Unix seconds at which `state` was published.
    timestamp: u64,
    /// Unix seconds at which a newer state replaced it; absent while latest.
    #[serde(default, rename = "replacedAt")]
    replaced_at: Option<u64>,
}

/// One gateway per network; the daemon registers one of these per entry in
/// its `[[resolvers]]` table.
#[derive(Clone, Debug)]
pub struct HttpStateResolver {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpStateResolver {
    pub fn new(
        endpoint: impl Into<String>,
        config: &HttpConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: config.client()?,
            endpoint: endpoint.into(),
        })
    }

    pub fn state_url(&self, contract_address: &str, did: &Did, state: &str) -> String {
        join(&self.endpoint, &format!("state/{contract_address}/{did}/{state}"))
    }
}

#[async_trait]
impl StateResolver for HttpStateResolver {
    async fn resolve(
        &self,
        network: &str,
        contract_address: &str,
        did: &Did,
        state: &str,
    ) -> Result<ResolvedState, ResolveError> {
        let url = self.state_url(contract_address, did, state);
        let response: StateResponse = match get_json(&self.http_client, &url).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                return Err(ResolveError::UnknownState {
                    did: did.to_string(),
                    state: state.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            network,
            did = %did,
            state = %response.state,
            replaced_at = ?response.replaced_at,
            "identity state resolved"
        );
        Ok(ResolvedState {
            state: response.state,
            published_at: Timestamp::new(response.timestamp),
            replaced_at: response.replaced_at.map(Timestamp::new),
        })
    }
}
